//! Overlay script injection into served HTML.

use std::borrow::Cow;

/// Closing tag the script element is inserted in front of.
const BODY_CLOSE: &str = "</body>";

/// Insert the overlay `<script>` element before the first `</body>`.
///
/// Documents that already mention `overlay_path` come back untouched, which
/// keeps repeated transforms from stacking duplicate tags. Documents without
/// a `</body>` tag are returned unchanged as well.
pub(crate) fn inject_overlay<'a>(html: &'a str, overlay_path: &str) -> Cow<'a, str> {
    if html.contains(overlay_path) {
        return Cow::Borrowed(html);
    }
    let Some(index) = html.find(BODY_CLOSE) else {
        return Cow::Borrowed(html);
    };

    let tag = script_tag(overlay_path);
    let mut injected = String::with_capacity(html.len() + tag.len());
    injected.push_str(&html[..index]);
    injected.push_str(&tag);
    injected.push_str(&html[index..]);
    Cow::Owned(injected)
}

/// The module script element that loads the overlay.
pub(crate) fn script_tag(overlay_path: &str) -> String {
    format!(r#"<script type="module" src="{overlay_path}"></script>"#)
}
