//! Cursor and selection markers embedded in fixture text.
//!
//! A fixture can mark a cursor position and a range to format by writing literal marker tokens
//! into its source. Before formatting, the markers are stripped out and turned into offsets; after
//! formatting, the cursor the engine reports is written back in so outputs stay readable.

pub const CURSOR_PLACEHOLDER: &str = "<|>";
pub const RANGE_START_PLACEHOLDER: &str = "<<<PRETTIER_RANGE_START>>>";
pub const RANGE_END_PLACEHOLDER: &str = "<<<PRETTIER_RANGE_END>>>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    RangeStart,
    Cursor,
    RangeEnd,
}

impl Marker {
    /// Ordered the way markers sharing one offset are written back
    const ALL: [Marker; 3] = [Marker::RangeStart, Marker::Cursor, Marker::RangeEnd];

    pub fn placeholder(self) -> &'static str {
        match self {
            Marker::Cursor => CURSOR_PLACEHOLDER,
            Marker::RangeStart => RANGE_START_PLACEHOLDER,
            Marker::RangeEnd => RANGE_END_PLACEHOLDER,
        }
    }
}

/// Character offsets of the markers found in a text, measured in the text with every marker
/// removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Placeholders {
    pub cursor_offset: Option<usize>,
    pub range_start: Option<usize>,
    pub range_end: Option<usize>,
}

impl Placeholders {
    pub fn get(&self, marker: Marker) -> Option<usize> {
        match marker {
            Marker::Cursor => self.cursor_offset,
            Marker::RangeStart => self.range_start,
            Marker::RangeEnd => self.range_end,
        }
    }

    fn slot(&mut self, marker: Marker) -> &mut Option<usize> {
        match marker {
            Marker::Cursor => &mut self.cursor_offset,
            Marker::RangeStart => &mut self.range_start,
            Marker::RangeEnd => &mut self.range_end,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Placeholders::default()
    }

    /// Strip the first occurrence of each marker from `text`.
    ///
    /// Markers are removed left to right, so each recorded offset already accounts for the
    /// markers that preceded it.
    pub fn decode(text: &str) -> (String, Placeholders) {
        let mut found: Vec<(usize, Marker)> = Marker::ALL
            .iter()
            .filter_map(|&marker| text.find(marker.placeholder()).map(|at| (at, marker)))
            .collect();
        found.sort_by_key(|&(at, _)| at);

        let mut stripped = text.to_owned();
        let mut placeholders = Placeholders::default();
        let mut removed = 0;
        for (at, marker) in found {
            let placeholder = marker.placeholder();
            let at = at - removed;
            stripped.replace_range(at..at + placeholder.len(), "");
            *placeholders.slot(marker) = Some(char_offset(&stripped, at));
            removed += placeholder.len();
        }
        (stripped, placeholders)
    }

    /// Write every present marker back into `text`; the inverse of [`Placeholders::decode`]
    pub fn encode(&self, text: &str) -> String {
        let mut markers: Vec<(usize, Marker)> = Marker::ALL
            .iter()
            .filter_map(|&marker| self.get(marker).map(|at| (byte_offset(text, at), marker)))
            .collect();
        // Stable, so markers sharing an offset keep the `Marker::ALL` order
        markers.sort_by_key(|&(at, _)| at);

        let mut encoded = String::with_capacity(text.len() + markers.len() * 32);
        let mut last = 0;
        for (at, marker) in markers {
            encoded.push_str(&text[last..at]);
            encoded.push_str(marker.placeholder());
            last = at;
        }
        encoded.push_str(&text[last..]);
        encoded
    }
}

/// Insert the cursor marker at the character offset `cursor_offset`; no offset leaves `text`
/// unchanged
pub fn insert_cursor(text: &str, cursor_offset: Option<usize>) -> String {
    match cursor_offset {
        Some(offset) => {
            let at = byte_offset(text, offset);
            format!("{}{}{}", &text[..at], CURSOR_PLACEHOLDER, &text[at..])
        }
        None => text.to_owned(),
    }
}

/// Number of characters before the byte index `at`
pub fn char_offset(text: &str, at: usize) -> usize {
    text.char_indices().take_while(|&(i, _)| i < at).count()
}

/// Byte index of the character offset `offset`, clamped to the end of `text`
pub fn byte_offset(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map_or(text.len(), |(at, _)| at)
}
