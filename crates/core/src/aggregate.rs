use crate::models::Element;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// Groups elements by page number and joins each page's text with single spaces.
///
/// The sort is stable, so elements keep their extraction order within a page no
/// matter how pages were interleaved in the input. Pages that end up blank are
/// dropped rather than emitted empty.
pub fn combine_by_page(mut elements: Vec<Element>) -> Vec<PageText> {
    elements.sort_by_key(Element::page_number);

    let mut pages = Vec::new();
    let mut current: Option<(u32, Vec<String>)> = None;

    for element in elements {
        let number = element.page_number();
        if let Some((page, texts)) = current.as_mut() {
            if *page == number {
                texts.push(element.text);
                continue;
            }
        }

        if let Some((page, texts)) = current.take() {
            push_page(&mut pages, page, &texts);
        }
        current = Some((number, vec![element.text]));
    }

    if let Some((page, texts)) = current {
        push_page(&mut pages, page, &texts);
    }

    pages
}

fn push_page(pages: &mut Vec<PageText>, number: u32, texts: &[String]) {
    let joined = texts
        .iter()
        .filter(|text| !text.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let text = joined.replace('\n', " ").trim().to_string();

    if !text.is_empty() {
        pages.push(PageText { number, text });
    }
}
