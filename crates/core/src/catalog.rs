use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, ScribeError};

/// The substitution placeholder every template must contain exactly once.
pub const PLACEHOLDER: &str = "{content}";

/// Reserved name for the ordering-privileged pass. A catalog may flag any
/// single template as the format pass, but this name must not be reused for
/// an unrelated template.
pub const FORMAT_PASS_NAME: &str = "format";

/// One named text-transformation step driven by a template.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub content: String,
    /// Marks the distinguished pass that runs before all others and feeds
    /// them its output.
    #[serde(default)]
    pub format: bool,
}

impl PromptTemplate {
    pub fn render(&self, input: &str) -> String {
        self.content.replace(PLACEHOLDER, input)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "pass")]
    passes: Vec<PromptTemplate>,
}

/// The full template catalog. Loaded once, validated, then shared read-only
/// across all jobs.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: Vec<PromptTemplate>,
}

impl Catalog {
    pub fn new(templates: Vec<PromptTemplate>) -> Result<Self> {
        let catalog = Self { templates };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        Self::new(file.passes)
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::from_toml_str(&text)
    }

    /// Built-in catalog used when no template file is supplied.
    pub fn builtin() -> Self {
        let templates = vec![
            PromptTemplate {
                name: FORMAT_PASS_NAME.to_string(),
                content: BUILTIN_FORMAT.to_string(),
                format: true,
            },
            PromptTemplate {
                name: "summary".to_string(),
                content: BUILTIN_SUMMARY.to_string(),
                format: false,
            },
            PromptTemplate {
                name: "outline".to_string(),
                content: BUILTIN_OUTLINE.to_string(),
                format: false,
            },
        ];
        Self::new(templates).expect("built-in catalog is valid")
    }

    pub fn get(&self, name: &str) -> Option<&PromptTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn format_pass(&self) -> Option<&PromptTemplate> {
        self.templates.iter().find(|t| t.format)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.iter().map(|t| t.name.as_str())
    }

    fn validate(&self) -> Result<()> {
        if self.templates.is_empty() {
            return Err(ScribeError::Catalog {
                reason: "catalog contains no templates".to_string(),
            });
        }
        for (i, template) in self.templates.iter().enumerate() {
            if template.name.trim().is_empty() {
                return Err(ScribeError::Catalog {
                    reason: "template with empty name".to_string(),
                });
            }
            if self.templates[..i].iter().any(|t| t.name == template.name) {
                return Err(ScribeError::Catalog {
                    reason: format!("duplicate template name '{}'", template.name),
                });
            }
            let placeholders = template.content.matches(PLACEHOLDER).count();
            if placeholders != 1 {
                return Err(ScribeError::Catalog {
                    reason: format!(
                        "template '{}' must contain exactly one {} placeholder, found {}",
                        template.name, PLACEHOLDER, placeholders
                    ),
                });
            }
            if template.name == FORMAT_PASS_NAME && !template.format {
                return Err(ScribeError::Catalog {
                    reason: format!(
                        "template '{FORMAT_PASS_NAME}' reuses the reserved format-pass name \
                         without the format flag"
                    ),
                });
            }
        }
        let flagged = self.templates.iter().filter(|t| t.format).count();
        if flagged > 1 {
            return Err(ScribeError::Catalog {
                reason: format!("{flagged} templates are flagged as the format pass"),
            });
        }
        Ok(())
    }
}

const BUILTIN_FORMAT: &str = "\
You are a transcript editor. Rewrite the raw speech-to-text transcript below into clean, \
readable prose: fix punctuation, drop filler words and false starts, merge fragments into \
full sentences and break the text into paragraphs at topic changes. Do not summarize, do \
not add content, and keep the original language.

Transcript:
{content}";

const BUILTIN_SUMMARY: &str = "\
You are a note taker. Produce structured markdown notes for the transcript below, in the \
transcript's language: a one-paragraph overview, then 5-7 bullet key takeaways (actionable, \
what to remember or do), then a short list of covered topics. Output markdown only.

Transcript:
{content}";

const BUILTIN_OUTLINE: &str = "\
You are a content outliner. Produce a hierarchical outline of the transcript below in its \
original language: top-level sections for each major topic shift with one-line descriptions, \
nested bullets for the supporting points. Output markdown only.

Transcript:
{content}";

#[cfg(test)]
mod tests {
    use super::*;

    fn template(name: &str, content: &str, format: bool) -> PromptTemplate {
        PromptTemplate {
            name: name.to_string(),
            content: content.to_string(),
            format,
        }
    }

    #[test]
    fn builtin_catalog_validates() {
        let catalog = Catalog::builtin();
        assert!(catalog.validate().is_ok());
        assert_eq!(catalog.format_pass().map(|t| t.name.as_str()), Some("format"));
    }

    #[test]
    fn rejects_duplicate_names() {
        let err = Catalog::new(vec![
            template("a", "x {content}", false),
            template("a", "y {content}", false),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn rejects_wrong_placeholder_count() {
        assert!(Catalog::new(vec![template("a", "no placeholder", false)]).is_err());
        assert!(Catalog::new(vec![template("a", "{content} {content}", false)]).is_err());
    }

    #[test]
    fn rejects_unflagged_template_named_format() {
        let err = Catalog::new(vec![template("format", "x {content}", false)]).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn rejects_two_format_passes() {
        let err = Catalog::new(vec![
            template("a", "x {content}", true),
            template("b", "y {content}", true),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("format pass"));
    }

    #[test]
    fn parses_toml_catalog() {
        let catalog = Catalog::from_toml_str(
            r#"
            [[pass]]
            name = "tidy"
            content = "Tidy this: {content}"
            format = true

            [[pass]]
            name = "summary"
            content = "Summarize: {content}"
            "#,
        )
        .unwrap();
        assert_eq!(catalog.names().count(), 2);
        assert_eq!(catalog.format_pass().map(|t| t.name.as_str()), Some("tidy"));
        assert_eq!(catalog.get("tidy").map(|t| t.render("hi")), Some("Tidy this: hi".into()));
    }
}
