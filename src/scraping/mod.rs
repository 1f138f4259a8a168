pub mod controller;
pub mod doors;
pub mod mappers;
pub mod outputs;
pub mod sectors;
pub mod zones;

use scraper::ElementRef;

/// Collapse an element's text nodes into one trimmed string.
pub(crate) fn cell_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
