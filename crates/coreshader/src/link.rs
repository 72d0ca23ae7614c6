use std::fmt;

use crate::compile::CompiledStage;
use crate::normalize::ShaderStage;
use crate::program::ProgramInterface;

/// Both stages plus the interface they were bridged against.
#[derive(Debug, Clone)]
pub struct LinkedProgram {
    pub vertex: CompiledStage,
    pub fragment: CompiledStage,
    pub interface: ProgramInterface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkFailure {
    pub log: String,
}

impl LinkFailure {
    pub fn new(log: impl Into<String>) -> Self {
        Self { log: log.into() }
    }

    pub fn section(&self) -> String {
        format!("[Link]\n{}", self.log.trim_end())
    }
}

impl fmt::Display for LinkFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.section())
    }
}

/// Checks that the compiled stages fit together.
///
/// Pipeline creation on the GPU can still fail afterwards; backends report
/// that through [`LinkFailure`] as well.
pub fn link(
    vertex: CompiledStage,
    fragment: CompiledStage,
    interface: ProgramInterface,
) -> Result<LinkedProgram, LinkFailure> {
    let mut problems = interface.conflicts.clone();
    for (compiled, expected) in [
        (&vertex, ShaderStage::Vertex),
        (&fragment, ShaderStage::Fragment),
    ] {
        if compiled.stage != expected {
            problems.push(format!(
                "expected a {expected} stage but got a {} stage",
                compiled.stage
            ));
            continue;
        }
        if !compiled
            .module
            .entry_points
            .iter()
            .any(|entry| entry.name == "main")
        {
            problems.push(format!("{expected} stage has no `main` entry point"));
        }
    }

    if !problems.is_empty() {
        tracing::debug!(count = problems.len(), "link rejected");
        return Err(LinkFailure::new(problems.join("\n")));
    }

    Ok(LinkedProgram {
        vertex,
        fragment,
        interface,
    })
}
