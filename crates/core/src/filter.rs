use crate::error::{LoaderError, Result};
use crate::models::{Element, ElementCategory, ProcessingConfig};
use tracing::warn;

/// Element predicates driven by the processing config, applied empty -> header -> references.
#[derive(Debug, Clone, Copy)]
pub struct ElementFilter {
    pub drop_empty: bool,
    pub drop_headers: bool,
    pub drop_references: bool,
}

impl From<&ProcessingConfig> for ElementFilter {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            drop_empty: config.filter_empty_elements,
            drop_headers: config.remove_headers,
            drop_references: config.remove_references,
        }
    }
}

impl ElementFilter {
    pub fn apply(&self, source_id: &str, elements: Vec<Element>) -> Vec<Element> {
        if elements.is_empty() {
            return elements;
        }

        let mut filtered = elements;

        if self.drop_empty {
            filtered.retain(|element| !element.text.trim().is_empty());
        }

        if self.drop_headers {
            filtered.retain(|element| element.category != ElementCategory::Header);
        }

        if self.drop_references {
            match references_title_id(&filtered) {
                Ok(Some(title_id)) => {
                    filtered.retain(|element| {
                        element.metadata.parent_id.as_deref() != Some(title_id.as_str())
                    });
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(source = source_id, error = %error, "skipping reference removal");
                }
            }
        }

        filtered
    }
}

/// Identity of the first "References" title. Only its direct children are removed.
fn references_title_id(elements: &[Element]) -> Result<Option<String>> {
    let Some(title) = elements.iter().find(|element| {
        element.category == ElementCategory::Title
            && element.text.trim().to_lowercase() == "references"
    }) else {
        return Ok(None);
    };

    if title.id.trim().is_empty() {
        return Err(LoaderError::ReferenceFilter(
            "references title has no element id".to_string(),
        ));
    }

    Ok(Some(title.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_filters() -> ElementFilter {
        ElementFilter {
            drop_empty: true,
            drop_headers: true,
            drop_references: true,
        }
    }

    fn texts(elements: &[Element]) -> Vec<&str> {
        elements.iter().map(|element| element.text.as_str()).collect()
    }

    #[test]
    fn defaults_only_drop_empty_elements() {
        let filter = ElementFilter::from(&ProcessingConfig::default());
        let filtered = filter.apply(
            "doc.pdf",
            vec![
                Element::new("1", ElementCategory::Header, "Running head"),
                Element::new("2", ElementCategory::NarrativeText, "  \n\t"),
                Element::new("3", ElementCategory::NarrativeText, "Body"),
            ],
        );

        assert_eq!(texts(&filtered), vec!["Running head", "Body"]);
    }

    #[test]
    fn headers_are_removed_when_enabled() {
        let filtered = all_filters().apply(
            "doc.pdf",
            vec![
                Element::new("1", ElementCategory::Header, "Running head"),
                Element::new("2", ElementCategory::Title, "Intro"),
            ],
        );

        assert_eq!(texts(&filtered), vec!["Intro"]);
    }

    #[test]
    fn direct_children_of_references_are_removed() {
        let filtered = all_filters().apply(
            "paper.pdf",
            vec![
                Element::new("t1", ElementCategory::Title, "Method"),
                Element::new("p1", ElementCategory::NarrativeText, "We measure.").with_parent("t1"),
                Element::new("t2", ElementCategory::Title, "  REFERENCES "),
                Element::new("r1", ElementCategory::ListItem, "[1] Someone").with_parent("t2"),
                Element::new("r2", ElementCategory::ListItem, "[2] Else").with_parent("t2"),
                Element::new("n1", ElementCategory::NarrativeText, "nested").with_parent("r1"),
            ],
        );

        assert_eq!(
            texts(&filtered),
            vec!["Method", "We measure.", "  REFERENCES ", "nested"]
        );
    }

    #[test]
    fn references_must_be_a_title() {
        let filtered = all_filters().apply(
            "paper.pdf",
            vec![
                Element::new("x", ElementCategory::NarrativeText, "References"),
                Element::new("y", ElementCategory::NarrativeText, "child").with_parent("x"),
            ],
        );

        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn missing_title_identity_leaves_elements_untouched() {
        let filtered = all_filters().apply(
            "paper.pdf",
            vec![
                Element::new("", ElementCategory::Title, "References"),
                Element::new("c", ElementCategory::ListItem, "[1] A").with_parent(""),
            ],
        );

        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn header_named_references_is_removed_before_lookup() {
        let filtered = all_filters().apply(
            "paper.pdf",
            vec![
                Element::new("h", ElementCategory::Header, "References"),
                Element::new("t", ElementCategory::Title, "References"),
                Element::new("c", ElementCategory::ListItem, "[1] A").with_parent("t"),
                Element::new("d", ElementCategory::ListItem, "[2] B").with_parent("h"),
            ],
        );

        assert_eq!(texts(&filtered), vec!["References", "[2] B"]);
    }
}
