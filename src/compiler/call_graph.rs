//! Call-site pre-pass
//!
//! Procedures return through a fixed pool of return-address cells, one per
//! static call site, so the pool sizes must be known before any procedure is
//! declared. This pass walks the whole program once and counts them.

use crate::ast::{Command, Program};
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::debug;

/// Static call-site counts per procedure
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    call_sites: HashMap<String, usize>,
}

impl CallGraph {
    /// Count call sites and reject calls to procedures that are never defined
    pub fn build(program: &Program, max_call_sites: usize) -> Result<Self> {
        let mut call_sites: HashMap<String, usize> = program
            .procedures
            .iter()
            .map(|p| (p.name.clone(), 0))
            .collect();

        let bodies = program
            .procedures
            .iter()
            .map(|p| p.commands.as_slice())
            .chain(std::iter::once(program.main.commands.as_slice()));

        for body in bodies {
            for callee in called_procedures(body) {
                let count = call_sites.get_mut(callee).ok_or_else(|| Error::Undeclared {
                    kind: "procedure",
                    name: callee.to_string(),
                })?;
                *count += 1;
            }
        }

        for proc in &program.procedures {
            let count = call_sites.get(&proc.name).copied().unwrap_or(0);
            if count > max_call_sites {
                return Err(Error::CallSiteLimit {
                    procedure: proc.name.clone(),
                    count,
                    limit: max_call_sites,
                });
            }
        }

        debug!(
            procedures = program.procedures.len(),
            call_sites = call_sites.values().sum::<usize>(),
            "call graph built"
        );
        Ok(Self { call_sites })
    }

    /// Number of static call sites of `name`
    pub fn call_sites(&self, name: &str) -> usize {
        self.call_sites.get(name).copied().unwrap_or(0)
    }

    /// Total call sites in the program
    pub fn total_call_sites(&self) -> usize {
        self.call_sites.values().sum()
    }
}

/// Names of the procedures called in `commands`, in source order, nested
/// bodies included
pub fn called_procedures(commands: &[Command]) -> Vec<&str> {
    let mut out = Vec::new();
    collect_calls(commands, &mut out);
    out
}

fn collect_calls<'a>(commands: &'a [Command], out: &mut Vec<&'a str>) {
    for cmd in commands {
        match cmd {
            Command::Call { name, .. } => out.push(name),
            Command::If { then_branch, .. } => collect_calls(then_branch, out),
            Command::IfElse {
                then_branch,
                else_branch,
                ..
            } => {
                collect_calls(then_branch, out);
                collect_calls(else_branch, out);
            }
            Command::While { body, .. }
            | Command::Repeat { body, .. }
            | Command::For { body, .. } => collect_calls(body, out),
            Command::Assign { .. } | Command::Read(_) | Command::Write(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Condition, Main, Procedure, RelOp, Value};
    use crate::ErrorKind;

    fn call(name: &str) -> Command {
        Command::Call {
            name: name.into(),
            args: vec![],
        }
    }

    fn program(procs: &[&str], main: Vec<Command>) -> Program {
        Program {
            procedures: procs
                .iter()
                .map(|name| Procedure {
                    name: name.to_string(),
                    params: vec![],
                    declarations: vec![],
                    commands: vec![],
                })
                .collect(),
            main: Main {
                declarations: vec![],
                commands: main,
            },
        }
    }

    #[test]
    fn test_counts_nested_calls() {
        let prog = program(
            &["p", "q"],
            vec![
                call("p"),
                Command::While {
                    condition: Condition::new(Value::num(1), RelOp::Eq, Value::num(2)),
                    body: vec![call("p"), call("q")],
                },
            ],
        );
        let graph = CallGraph::build(&prog, 100).unwrap();
        assert_eq!(graph.call_sites("p"), 2);
        assert_eq!(graph.call_sites("q"), 1);
        assert_eq!(graph.total_call_sites(), 3);
    }

    #[test]
    fn test_undefined_callee() {
        let prog = program(&["p"], vec![call("missing")]);
        let err = CallGraph::build(&prog, 100).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Undeclared);
    }

    #[test]
    fn test_call_site_limit() {
        let prog = program(&["p"], vec![call("p"), call("p"), call("p")]);
        let err = CallGraph::build(&prog, 2).unwrap_err();
        assert_eq!(
            err,
            Error::CallSiteLimit {
                procedure: "p".into(),
                count: 3,
                limit: 2
            }
        );
    }
}
