//! Symbol table and address allocator
//!
//! Every declared entity gets its own cell (or contiguous cell range) from a
//! single monotonically increasing cursor that starts after the reserved
//! scratch band, so no two entities ever share an address. Name lookups take
//! an explicit [`Scope`]: the main block or one procedure.

use super::assembler::Label;
use super::call_graph;
use super::instruction::Address;
use super::memory::RESERVED_CELLS;
use crate::ast;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

/// Handle of a declared procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcId(usize);

/// Name resolution context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Main block: globals and iterators
    Main,
    /// Procedure body: parameters, locals, then globals and iterators
    Procedure(ProcId),
}

/// Scalar variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variable {
    /// Cell holding the value
    pub address: Address,
    /// Set on first assignment, `READ`, or by-reference pass
    pub initialized: bool,
}

/// Array with inclusive bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Array {
    /// Cell of `first`
    pub base: Address,
    /// First valid index
    pub first: i64,
    /// Last valid index
    pub last: i64,
    /// Address index 0 would occupy (`base - first`)
    pub origin: i64,
}

impl Array {
    /// Number of cells
    pub fn cell_count(&self) -> u64 {
        (self.last as i128 - self.first as i128 + 1) as u64
    }

    /// Address of element `index`, `None` when out of bounds
    pub fn element(&self, index: i64) -> Option<Address> {
        if index < self.first || index > self.last {
            return None;
        }
        Some((self.base as i128 + (index as i128 - self.first as i128)) as Address)
    }
}

/// For-loop iterator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopIterator {
    /// Current value
    pub address: Address,
    /// End value snapshot, shifted by one past the last iteration
    pub limit: Address,
}

/// Shape of a formal parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Cell holds the address of the caller's scalar
    Scalar,
    /// Cell holds the index-zero origin of the caller's array
    Array,
}

/// Formal parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Scalar or array
    pub kind: ParamKind,
    /// Cell holding the reference
    pub cell: Address,
}

/// Global or procedure-local entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Variable(Variable),
    Array(Array),
}

/// Procedure record
#[derive(Debug, Clone)]
pub struct ProcedureSymbols {
    /// Procedure name
    pub name: String,
    /// Formal parameters in declaration order
    pub params: Vec<Parameter>,
    locals: HashMap<String, Entry>,
    /// Entry point, bound when generation reaches the body
    pub entry: Option<Label>,
    /// Return-address cells, one per static call site
    pub return_slots: Vec<Address>,
    /// Cell holding the address of the slot used by the active call
    pub current_slot: Address,
    call_count: usize,
}

impl ProcedureSymbols {
    /// Call sites lowered so far
    pub fn call_count(&self) -> usize {
        self.call_count
    }
}

/// What a name refers to in a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Global or local scalar
    Variable(Variable),
    /// Global or local array
    Array(Array),
    /// Scalar parameter: `cell` holds the address of the value
    ScalarParam {
        /// Reference cell
        cell: Address,
    },
    /// Array parameter: `cell` holds the index-zero origin
    ArrayParam {
        /// Reference cell
        cell: Address,
    },
    /// Loop iterator
    Iterator(LoopIterator),
}

impl Binding {
    /// Whether the binding denotes an array
    pub fn is_array(&self) -> bool {
        matches!(self, Binding::Array(_) | Binding::ArrayParam { .. })
    }

    /// `"array"` or `"scalar"`, for type-mismatch messages
    pub fn shape(&self) -> &'static str {
        if self.is_array() {
            "array"
        } else {
            "scalar"
        }
    }
}

/// Where an array index comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Literal index
    Literal(i64),
    /// Variable or iterator cell
    Direct(Address),
    /// Scalar parameter cell (holds the address of the index)
    Indirect(Address),
}

/// Resolved array element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementAddress {
    /// Literal index into a known array
    Static(Address),
    /// Dynamic index into a known array: `origin + index`
    Offset {
        /// Index-zero origin of the array
        origin: i64,
        /// Index location
        index: IndexSource,
    },
    /// Element of an array parameter: `mem[cell] + index`
    Param {
        /// Reference cell of the parameter
        cell: Address,
        /// Index location
        index: IndexSource,
    },
}

/// Symbol table owning all allocations of one compilation
#[derive(Debug, Clone)]
pub struct SymbolTable {
    globals: HashMap<String, Entry>,
    iterators: HashMap<String, LoopIterator>,
    procedures: Vec<ProcedureSymbols>,
    procedure_ids: HashMap<String, ProcId>,
    next_address: Address,
}

impl SymbolTable {
    /// Empty table; the cursor starts after the reserved band
    pub fn new() -> Self {
        Self {
            globals: HashMap::new(),
            iterators: HashMap::new(),
            procedures: Vec::new(),
            procedure_ids: HashMap::new(),
            next_address: RESERVED_CELLS,
        }
    }

    /// Next free cell
    pub fn next_address(&self) -> Address {
        self.next_address
    }

    fn allocate(&mut self, name: &str, cells: u64) -> Result<Address> {
        let address = self.next_address;
        self.next_address = self
            .next_address
            .checked_add(cells)
            .ok_or_else(|| Error::AddressSpaceExhausted {
                name: name.to_string(),
            })?;
        Ok(address)
    }

    fn table(&self, scope: Scope) -> &HashMap<String, Entry> {
        match scope {
            Scope::Main => &self.globals,
            Scope::Procedure(id) => &self.procedures[id.0].locals,
        }
    }

    fn table_mut(&mut self, scope: Scope) -> &mut HashMap<String, Entry> {
        match scope {
            Scope::Main => &mut self.globals,
            Scope::Procedure(id) => &mut self.procedures[id.0].locals,
        }
    }

    fn is_bound_locally(&self, scope: Scope, name: &str) -> bool {
        if self.table(scope).contains_key(name) || self.iterators.contains_key(name) {
            return true;
        }
        match scope {
            Scope::Main => false,
            Scope::Procedure(id) => self.procedures[id.0].params.iter().any(|p| p.name == name),
        }
    }

    /// Declare a scalar variable in `scope`
    pub fn declare_variable(&mut self, scope: Scope, name: &str) -> Result<Address> {
        if self.is_bound_locally(scope, name) {
            return Err(Error::Redeclaration {
                kind: "variable",
                name: name.to_string(),
            });
        }
        let address = self.allocate(name, 1)?;
        self.table_mut(scope).insert(
            name.to_string(),
            Entry::Variable(Variable {
                address,
                initialized: false,
            }),
        );
        Ok(address)
    }

    /// Declare `name[first:last]` in `scope`
    pub fn declare_array(&mut self, scope: Scope, name: &str, first: i64, last: i64) -> Result<Array> {
        if self.is_bound_locally(scope, name) {
            return Err(Error::Redeclaration {
                kind: "array",
                name: name.to_string(),
            });
        }
        let invalid = || Error::InvalidArrayRange {
            name: name.to_string(),
            first,
            last,
        };
        if first > last {
            return Err(invalid());
        }
        let len = u64::try_from(last as i128 - first as i128 + 1).map_err(|_| invalid())?;
        let base = self.allocate(name, len)?;
        let origin = i64::try_from(base as i128 - first as i128).map_err(|_| invalid())?;
        let array = Array {
            base,
            first,
            last,
            origin,
        };
        self.table_mut(scope)
            .insert(name.to_string(), Entry::Array(array));
        Ok(array)
    }

    /// Declare a declaration node in `scope`
    pub fn declare(&mut self, scope: Scope, decl: &ast::Declaration) -> Result<()> {
        match decl {
            ast::Declaration::Variable(name) => self.declare_variable(scope, name).map(|_| ()),
            ast::Declaration::Array { name, first, last } => {
                self.declare_array(scope, name, *first, *last).map(|_| ())
            }
        }
    }

    /// Bind a for-loop iterator (value and limit cells)
    pub fn declare_iterator(&mut self, scope: Scope, name: &str) -> Result<LoopIterator> {
        if self.resolve(scope, name).is_ok() {
            return Err(Error::Redeclaration {
                kind: "iterator",
                name: name.to_string(),
            });
        }
        let address = self.allocate(name, 2)?;
        let iterator = LoopIterator {
            address,
            limit: address + 1,
        };
        self.iterators.insert(name.to_string(), iterator);
        Ok(iterator)
    }

    /// Unbind an iterator at loop exit; its cells stay reserved
    pub fn exit_iterator(&mut self, name: &str) {
        self.iterators.remove(name);
    }

    /// Declare a procedure with `return_slots` call-site slots
    ///
    /// Every procedure called in the body must already be declared and must
    /// not be the procedure itself.
    pub fn declare_procedure(&mut self, proc: &ast::Procedure, return_slots: usize) -> Result<ProcId> {
        let name = proc.name.as_str();
        if self.procedure_ids.contains_key(name) || self.globals.contains_key(name) {
            return Err(Error::Redeclaration {
                kind: "procedure",
                name: name.to_string(),
            });
        }

        for callee in call_graph::called_procedures(&proc.commands) {
            if callee == name {
                return Err(Error::Recursion {
                    procedure: name.to_string(),
                });
            }
            if !self.procedure_ids.contains_key(callee) {
                return Err(Error::CallOrder {
                    caller: name.to_string(),
                    callee: callee.to_string(),
                });
            }
        }

        let id = ProcId(self.procedures.len());
        self.procedures.push(ProcedureSymbols {
            name: name.to_string(),
            params: Vec::with_capacity(proc.params.len()),
            locals: HashMap::new(),
            entry: None,
            return_slots: Vec::new(),
            current_slot: 0,
            call_count: 0,
        });
        self.procedure_ids.insert(name.to_string(), id);
        let scope = Scope::Procedure(id);

        for param in &proc.params {
            if self.is_bound_locally(scope, param.name()) {
                return Err(Error::Redeclaration {
                    kind: "parameter",
                    name: param.name().to_string(),
                });
            }
            let kind = match param {
                ast::Param::Scalar(_) => ParamKind::Scalar,
                ast::Param::Array(_) => ParamKind::Array,
            };
            let cell = self.allocate(param.name(), 1)?;
            self.procedures[id.0].params.push(Parameter {
                name: param.name().to_string(),
                kind,
                cell,
            });
        }

        for decl in &proc.declarations {
            self.declare(scope, decl)?;
        }

        let first_slot = self.allocate(name, return_slots as u64)?;
        let current_slot = self.allocate(name, 1)?;
        let record = &mut self.procedures[id.0];
        record.return_slots = (0..return_slots as u64).map(|i| first_slot + i).collect();
        record.current_slot = current_slot;

        debug!(
            procedure = name,
            params = proc.params.len(),
            return_slots,
            next_address = self.next_address,
            "procedure declared"
        );
        Ok(id)
    }

    /// Look up a procedure by name
    pub fn procedure_id(&self, name: &str) -> Option<ProcId> {
        self.procedure_ids.get(name).copied()
    }

    /// Procedure record
    pub fn procedure(&self, id: ProcId) -> &ProcedureSymbols {
        &self.procedures[id.0]
    }

    /// Record the entry label of a procedure
    pub fn set_entry(&mut self, id: ProcId, label: Label) {
        self.procedures[id.0].entry = Some(label);
    }

    /// Reserve the next return slot of `id` for a new call site
    pub fn next_return_slot(&mut self, id: ProcId) -> Result<Address> {
        let record = &mut self.procedures[id.0];
        let slot = record
            .return_slots
            .get(record.call_count)
            .copied()
            .ok_or_else(|| Error::CallSiteLimit {
                procedure: record.name.clone(),
                count: record.call_count + 1,
                limit: record.return_slots.len(),
            })?;
        record.call_count += 1;
        Ok(slot)
    }

    /// Resolve `name` in `scope`: parameters and locals, then globals, then iterators
    pub fn resolve(&self, scope: Scope, name: &str) -> Result<Binding> {
        if let Scope::Procedure(id) = scope {
            let record = &self.procedures[id.0];
            if let Some(param) = record.params.iter().find(|p| p.name == name) {
                return Ok(match param.kind {
                    ParamKind::Scalar => Binding::ScalarParam { cell: param.cell },
                    ParamKind::Array => Binding::ArrayParam { cell: param.cell },
                });
            }
            if let Some(entry) = record.locals.get(name) {
                return Ok(entry.binding());
            }
        }
        if let Some(entry) = self.globals.get(name) {
            return Ok(entry.binding());
        }
        if let Some(iterator) = self.iterators.get(name) {
            return Ok(Binding::Iterator(*iterator));
        }
        Err(Error::Undeclared {
            kind: "variable",
            name: name.to_string(),
        })
    }

    /// Mark a scalar variable as initialized; other bindings are left alone
    pub fn mark_initialized(&mut self, scope: Scope, name: &str) {
        if let Scope::Procedure(id) = scope {
            let record = &mut self.procedures[id.0];
            if record.params.iter().any(|p| p.name == name) {
                return;
            }
            if let Some(Entry::Variable(var)) = record.locals.get_mut(name) {
                var.initialized = true;
                return;
            }
        }
        if let Some(Entry::Variable(var)) = self.globals.get_mut(name) {
            var.initialized = true;
        }
    }

    /// Resolve `array[index]`
    ///
    /// Literal indices into arrays with known bounds are range-checked; an
    /// identifier index is only checked for being a declared, initialized scalar.
    pub fn address_of_element(&self, scope: Scope, array: &str, index: &IndexRef<'_>) -> Result<ElementAddress> {
        let binding = self.resolve(scope, array).map_err(|_| Error::Undeclared {
            kind: "array",
            name: array.to_string(),
        })?;

        let source = match index {
            IndexRef::Literal(i) => IndexSource::Literal(*i),
            IndexRef::Name(name) => match self.resolve(scope, name)? {
                Binding::Variable(var) if !var.initialized => {
                    return Err(Error::UninitializedUse {
                        name: name.to_string(),
                    })
                }
                Binding::Variable(var) => IndexSource::Direct(var.address),
                Binding::Iterator(it) => IndexSource::Direct(it.address),
                Binding::ScalarParam { cell } => IndexSource::Indirect(cell),
                Binding::Array(_) | Binding::ArrayParam { .. } => {
                    return Err(Error::TypeMismatch {
                        name: name.to_string(),
                        expected: "scalar",
                        got: "array",
                    })
                }
            },
        };

        match binding {
            Binding::Array(arr) => match source {
                IndexSource::Literal(i) => {
                    arr.element(i)
                        .map(ElementAddress::Static)
                        .ok_or_else(|| Error::IndexOutOfBounds {
                            name: array.to_string(),
                            index: i,
                            first: arr.first,
                            last: arr.last,
                        })
                }
                index => Ok(ElementAddress::Offset {
                    origin: arr.origin,
                    index,
                }),
            },
            Binding::ArrayParam { cell } => Ok(ElementAddress::Param {
                cell,
                index: source,
            }),
            _ => Err(Error::TypeMismatch {
                name: array.to_string(),
                expected: "array",
                got: "scalar",
            }),
        }
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Entry {
    fn binding(&self) -> Binding {
        match self {
            Entry::Variable(var) => Binding::Variable(*var),
            Entry::Array(arr) => Binding::Array(*arr),
        }
    }
}

/// Array index as written in the source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRef<'a> {
    /// `t[5]`
    Literal(i64),
    /// `t[i]`
    Name(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Command, Declaration, Param, Procedure};
    use crate::ErrorKind;

    fn procedure(name: &str, params: Vec<Param>, locals: &[&str], commands: Vec<Command>) -> Procedure {
        Procedure {
            name: name.into(),
            params,
            declarations: locals
                .iter()
                .map(|n| Declaration::Variable(n.to_string()))
                .collect(),
            commands,
        }
    }

    #[test]
    fn test_addresses_start_after_reserved_band() {
        let mut table = SymbolTable::new();
        let n = table.declare_variable(Scope::Main, "n").unwrap();
        let arr = table.declare_array(Scope::Main, "t", 10, 14).unwrap();
        let m = table.declare_variable(Scope::Main, "m").unwrap();
        assert_eq!(n, RESERVED_CELLS);
        assert_eq!(arr.base, RESERVED_CELLS + 1);
        assert_eq!(arr.cell_count(), 5);
        assert_eq!(m, RESERVED_CELLS + 6);
        assert_eq!(arr.element(12), Some(arr.base + 2));
        assert_eq!(arr.origin, arr.base as i64 - 10);
    }

    #[test]
    fn test_redeclaration_in_same_scope() {
        let mut table = SymbolTable::new();
        table.declare_variable(Scope::Main, "n").unwrap();
        let err = table.declare_array(Scope::Main, "n", 0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Redeclaration);
    }

    #[test]
    fn test_invalid_array_range() {
        let mut table = SymbolTable::new();
        let err = table.declare_array(Scope::Main, "t", 4, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(table.next_address(), RESERVED_CELLS);
    }

    #[test]
    fn test_address_space_exhaustion() {
        let mut table = SymbolTable::new();
        table.next_address = Address::MAX;
        assert_eq!(
            table.declare_variable(Scope::Main, "n").unwrap_err(),
            Error::AddressSpaceExhausted { name: "n".into() }
        );
        let err = table.declare_iterator(Scope::Main, "i").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
        let err = table.declare_array(Scope::Main, "t", 0, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Limit);
        assert_eq!(table.next_address(), Address::MAX);

        let proc = procedure("p", vec![Param::Scalar("x".into())], &[], vec![]);
        let err = table.declare_procedure(&proc, 1).unwrap_err();
        assert_eq!(err, Error::AddressSpaceExhausted { name: "x".into() });
    }

    #[test]
    fn test_same_local_name_in_two_procedures() {
        let mut table = SymbolTable::new();
        let a = table
            .declare_procedure(&procedure("a", vec![], &["x"], vec![]), 0)
            .unwrap();
        let b = table
            .declare_procedure(&procedure("b", vec![], &["x"], vec![]), 0)
            .unwrap();
        let xa = table.resolve(Scope::Procedure(a), "x").unwrap();
        let xb = table.resolve(Scope::Procedure(b), "x").unwrap();
        assert_ne!(xa, xb);
    }

    #[test]
    fn test_procedure_layout() {
        let mut table = SymbolTable::new();
        let proc = procedure(
            "p",
            vec![Param::Array("t".into()), Param::Scalar("n".into())],
            &["k"],
            vec![],
        );
        let id = table.declare_procedure(&proc, 3).unwrap();
        let record = table.procedure(id);
        assert_eq!(record.params[0].cell, RESERVED_CELLS);
        assert_eq!(record.params[1].cell, RESERVED_CELLS + 1);
        assert_eq!(record.return_slots.len(), 3);
        assert_eq!(record.current_slot, RESERVED_CELLS + 6);
        assert_eq!(
            table.resolve(Scope::Procedure(id), "t").unwrap(),
            Binding::ArrayParam {
                cell: RESERVED_CELLS
            }
        );
    }

    #[test]
    fn test_parameter_and_local_collide() {
        let mut table = SymbolTable::new();
        let proc = procedure("p", vec![Param::Scalar("n".into())], &["n"], vec![]);
        let err = table.declare_procedure(&proc, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Redeclaration);
    }

    #[test]
    fn test_recursive_and_forward_calls() {
        let call = |name: &str| Command::Call {
            name: name.into(),
            args: vec![],
        };
        let mut table = SymbolTable::new();
        let err = table
            .declare_procedure(&procedure("p", vec![], &[], vec![call("p")]), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Recursion);

        let err = table
            .declare_procedure(&procedure("q", vec![], &[], vec![call("later")]), 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CallOrder);
    }

    #[test]
    fn test_return_slots_are_distinct_and_bounded() {
        let mut table = SymbolTable::new();
        let id = table
            .declare_procedure(&procedure("p", vec![], &[], vec![]), 2)
            .unwrap();
        let first = table.next_return_slot(id).unwrap();
        let second = table.next_return_slot(id).unwrap();
        assert_ne!(first, second);
        assert_eq!(table.procedure(id).call_count(), 2);
        assert_eq!(
            table.next_return_slot(id).unwrap_err().kind(),
            ErrorKind::Limit
        );
    }

    #[test]
    fn test_iterator_lifetime() {
        let mut table = SymbolTable::new();
        table.declare_variable(Scope::Main, "n").unwrap();
        assert!(table.declare_iterator(Scope::Main, "n").is_err());
        let it = table.declare_iterator(Scope::Main, "i").unwrap();
        assert_eq!(it.limit, it.address + 1);
        assert!(table.declare_iterator(Scope::Main, "i").is_err());
        table.exit_iterator("i");
        assert!(table.resolve(Scope::Main, "i").is_err());
        let again = table.declare_iterator(Scope::Main, "i").unwrap();
        assert_ne!(again.address, it.address);
    }

    #[test]
    fn test_element_addresses() {
        let mut table = SymbolTable::new();
        let arr = table.declare_array(Scope::Main, "t", 1, 5).unwrap();
        table.declare_variable(Scope::Main, "i").unwrap();

        assert_eq!(
            table
                .address_of_element(Scope::Main, "t", &IndexRef::Literal(5))
                .unwrap(),
            ElementAddress::Static(arr.base + 4)
        );
        let err = table
            .address_of_element(Scope::Main, "t", &IndexRef::Literal(6))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);

        let err = table
            .address_of_element(Scope::Main, "t", &IndexRef::Name("i"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UninitializedUse);

        table.mark_initialized(Scope::Main, "i");
        assert!(matches!(
            table
                .address_of_element(Scope::Main, "t", &IndexRef::Name("i"))
                .unwrap(),
            ElementAddress::Offset { .. }
        ));

        let err = table
            .address_of_element(Scope::Main, "i", &IndexRef::Literal(0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }
}
