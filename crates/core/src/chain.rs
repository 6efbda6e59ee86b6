//! Resolves a requested set of pass names into an ordered execution plan.
//!
//! This is the single place pass ordering is decided: the format pass, if
//! requested, runs first on the normalized transcript and every other pass
//! consumes its output; without it, all passes read the normalized
//! transcript and are mutually independent.

use crate::catalog::Catalog;
use crate::error::{Result, ScribeError};

/// Where a pass reads its input from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassInput {
    NormalizedTranscript,
    Output(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPass {
    pub name: String,
    pub input: PassInput,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    passes: Vec<PlannedPass>,
}

impl ExecutionPlan {
    pub fn passes(&self) -> &[PlannedPass] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

/// Build the execution plan for `requested` against the catalog.
///
/// Duplicates beyond the first occurrence are ignored. Fails with
/// `UnknownPass` before any stage executes if a name has no template.
pub fn resolve(requested: &[String], catalog: &Catalog) -> Result<ExecutionPlan> {
    if requested.is_empty() {
        return Err(ScribeError::Catalog {
            reason: "no passes requested".to_string(),
        });
    }

    let mut names: Vec<&str> = Vec::with_capacity(requested.len());
    for name in requested {
        if !names.contains(&name.as_str()) {
            names.push(name.as_str());
        }
    }

    for name in &names {
        if catalog.get(name).is_none() {
            return Err(ScribeError::UnknownPass {
                name: (*name).to_string(),
            });
        }
    }

    let format_name = names
        .iter()
        .find(|name| catalog.get(name).is_some_and(|t| t.format))
        .map(|name| name.to_string());

    let mut passes = Vec::with_capacity(names.len());
    if let Some(format_name) = &format_name {
        passes.push(PlannedPass {
            name: format_name.clone(),
            input: PassInput::NormalizedTranscript,
        });
    }
    for name in names {
        if Some(name) == format_name.as_deref() {
            continue;
        }
        let input = match &format_name {
            Some(format_name) => PassInput::Output(format_name.clone()),
            None => PassInput::NormalizedTranscript,
        };
        passes.push(PlannedPass {
            name: name.to_string(),
            input,
        });
    }

    Ok(ExecutionPlan { passes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PromptTemplate;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            PromptTemplate {
                name: "format".into(),
                content: "f {content}".into(),
                format: true,
            },
            PromptTemplate {
                name: "summary".into(),
                content: "s {content}".into(),
                format: false,
            },
            PromptTemplate {
                name: "outline".into(),
                content: "o {content}".into(),
                format: false,
            },
        ])
        .unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn format_pass_is_scheduled_first_regardless_of_position() {
        let plan = resolve(&names(&["summary", "outline", "format"]), &catalog()).unwrap();
        assert_eq!(plan.passes()[0].name, "format");
        assert_eq!(plan.passes()[0].input, PassInput::NormalizedTranscript);
        for pass in &plan.passes()[1..] {
            assert_eq!(pass.input, PassInput::Output("format".into()));
        }
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn without_format_pass_all_read_the_transcript() {
        let plan = resolve(&names(&["summary", "outline"]), &catalog()).unwrap();
        assert_eq!(plan.len(), 2);
        for pass in plan.passes() {
            assert_eq!(pass.input, PassInput::NormalizedTranscript);
        }
        // Request order is preserved for independent passes.
        assert_eq!(plan.passes()[0].name, "summary");
        assert_eq!(plan.passes()[1].name, "outline");
    }

    #[test]
    fn duplicates_beyond_the_first_are_ignored() {
        let plan = resolve(
            &names(&["summary", "summary", "format", "summary"]),
            &catalog(),
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.passes()[0].name, "format");
        assert_eq!(plan.passes()[1].name, "summary");
    }

    #[test]
    fn unknown_pass_fails_fast() {
        let err = resolve(&names(&["summary", "nope"]), &catalog()).unwrap_err();
        assert!(matches!(err, ScribeError::UnknownPass { name } if name == "nope"));
    }

    #[test]
    fn empty_request_is_rejected() {
        assert!(resolve(&[], &catalog()).is_err());
    }

    #[test]
    fn single_format_pass_plan() {
        let plan = resolve(&names(&["format"]), &catalog()).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.passes()[0].input, PassInput::NormalizedTranscript);
    }
}
