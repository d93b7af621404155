//! Character data helpers shared by the OOXML readers.

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::BytesRef;

/// Appends the text an `&...;` reference in character data stands for.
/// References to anything but the predefined entities are kept as written.
pub(crate) fn push_reference(out: &mut String, e: &BytesRef<'_>) -> quick_xml::Result<()> {
    if let Some(c) = e.resolve_char_ref()? {
        out.push(c);
        return Ok(());
    }

    let name = e.decode()?;
    match resolve_predefined_entity(&name) {
        Some(value) => out.push_str(value),
        None => {
            out.push('&');
            out.push_str(&name);
            out.push(';');
        }
    }
    Ok(())
}
