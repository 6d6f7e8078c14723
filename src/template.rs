//! Prompt template compilation and rendering.

use crate::config::TemplateSyntax;
use crate::error::{Error, Result};
use tera::{Context, Tera};

/// Name of the slot that receives the combined file content.
pub const FILES_CONTENT: &str = "files_content";

const TERA_TEMPLATE_NAME: &str = "prompt";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    FilesContent,
}

#[derive(Debug)]
enum Engine {
    Placeholder(Vec<Segment>),
    Tera(Box<Tera>),
}

/// A compiled prompt template.
#[derive(Debug)]
pub struct PromptTemplate {
    engine: Engine,
    uses_files_content: bool,
}

impl PromptTemplate {
    /// Compiles `text` using the given syntax.
    ///
    /// A template without a `files_content` slot compiles, but every prompt
    /// rendered from it will ignore the group's files; see
    /// [`PromptTemplate::uses_files_content`].
    ///
    /// # Errors
    ///
    /// Returns a template error if the text references fields other than
    /// `files_content`, has unbalanced braces, or is not valid Tera.
    pub fn parse(text: &str, syntax: TemplateSyntax) -> Result<Self> {
        let (engine, uses_files_content) = match syntax {
            TemplateSyntax::Placeholder => {
                let segments = parse_placeholders(text)?;
                let uses_files_content = segments.contains(&Segment::FilesContent);
                (Engine::Placeholder(segments), uses_files_content)
            }
            TemplateSyntax::Tera => {
                let mut tera = Tera::default();
                tera.autoescape_on(vec![]);
                tera.add_raw_template(TERA_TEMPLATE_NAME, text)?;
                (Engine::Tera(Box::new(tera)), text.contains(FILES_CONTENT))
            }
        };

        Ok(Self {
            engine,
            uses_files_content,
        })
    }

    /// Whether rendered prompts include the combined file content.
    #[must_use]
    pub const fn uses_files_content(&self) -> bool {
        self.uses_files_content
    }

    /// Renders the prompt for one group.
    ///
    /// # Errors
    ///
    /// Returns a template error if Tera rendering fails.
    pub fn render(&self, files_content: &str, group: &str) -> Result<String> {
        match &self.engine {
            Engine::Placeholder(segments) => {
                let mut prompt = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => prompt.push_str(text),
                        Segment::FilesContent => prompt.push_str(files_content),
                    }
                }
                Ok(prompt)
            }
            Engine::Tera(tera) => {
                let mut context = Context::new();
                context.insert(FILES_CONTENT, files_content);
                context.insert("group", group);
                Ok(tera.render(TERA_TEMPLATE_NAME, &context)?)
            }
        }
    }
}

fn parse_placeholders(text: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, next)| next == '{').is_some() {
                    literal.push('{');
                    continue;
                }

                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, '{')) => {
                            return Err(Error::template(format!(
                                "nested '{{' in placeholder starting at byte {pos}"
                            )));
                        }
                        Some((_, ch)) => field.push(ch),
                        None => {
                            return Err(Error::template(format!(
                                "unclosed '{{' at byte {pos}"
                            )));
                        }
                    }
                }

                if field != FILES_CONTENT {
                    return Err(Error::template(format!(
                        "unknown placeholder '{{{field}}}' at byte {pos}; only '{{{FILES_CONTENT}}}' is supported (write '{{{{' for a literal brace)"
                    )));
                }

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::FilesContent);
            }
            '}' => {
                if chars.next_if(|&(_, next)| next == '}').is_none() {
                    return Err(Error::template(format!(
                        "single '}}' at byte {pos} (write '}}}}' for a literal brace)"
                    )));
                }
                literal.push('}');
            }
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder(text: &str) -> Result<PromptTemplate> {
        PromptTemplate::parse(text, TemplateSyntax::Placeholder)
    }

    #[test]
    fn test_substitutes_files_content() {
        let template = placeholder("Questions for:\n{files_content}\nEnd").unwrap();
        assert!(template.uses_files_content());
        let rendered = template.render("FILES", "core1").unwrap();

        assert_eq!(rendered, "Questions for:\nFILES\nEnd");
    }

    #[test]
    fn test_double_braces_are_literal() {
        let template = placeholder("Answer as JSON {{\"q\": \"...\"}}\n{files_content}").unwrap();
        let rendered = template.render("X", "g1").unwrap();

        assert_eq!(rendered, "Answer as JSON {\"q\": \"...\"}\nX");
    }

    #[test]
    fn test_braces_in_content_are_untouched() {
        let template = placeholder("{files_content}").unwrap();
        let rendered = template.render("fn main() { {x} }", "g1").unwrap();

        assert_eq!(rendered, "fn main() { {x} }");
    }

    #[test]
    fn test_repeated_slot() {
        let template = placeholder("{files_content}|{files_content}").unwrap();
        assert_eq!(template.render("a", "g1").unwrap(), "a|a");
    }

    #[test]
    fn test_template_without_slot() {
        let template = placeholder("static prompt").unwrap();
        assert!(!template.uses_files_content());
        assert_eq!(template.render("ignored", "g1").unwrap(), "static prompt");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = placeholder("{files_content} {language}").unwrap_err();
        assert!(err.to_string().contains("{language}"));
    }

    #[test]
    fn test_unbalanced_braces_rejected() {
        assert!(placeholder("{files_content").is_err());
        assert!(placeholder("oops } {files_content}").is_err());
        assert!(placeholder("{files_{content}}").is_err());
    }

    #[test]
    fn test_tera_template() {
        let template = PromptTemplate::parse(
            "Group {{ group }}:\n{{ files_content }}",
            TemplateSyntax::Tera,
        )
        .unwrap();
        let rendered = template.render("<a & b>", "core2").unwrap();

        assert_eq!(rendered, "Group core2:\n<a & b>");
    }

    #[test]
    fn test_tera_syntax_error() {
        let result = PromptTemplate::parse("{% if %}", TemplateSyntax::Tera);
        assert!(result.is_err());
    }
}
