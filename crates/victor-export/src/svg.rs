//! SVG document serializer.
//!
//! Emits one `<path>` holding every subpath of a [`RenderedPath`], with
//! the dash pattern of its reveal and, unless disabled, a SMIL `<animate>`
//! that slides the dash offset to zero so the file animates on its own in
//! a browser.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::Text;
use svg::node::element::{Animate, Description, Path, Title};

use crate::animation::RenderedPath;

/// Metadata to embed in the SVG document.
///
/// When present, `<title>` and `<desc>` are emitted right after the
/// opening `<svg>` tag. Text is XML-escaped by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, typically the source image file stem.
    pub title: Option<&'a str>,

    /// Document description.
    pub description: Option<&'a str>,
}

/// Serialize `rendered` into a complete SVG document.
///
/// The `viewBox` is `0 0 width height` in source pixels. With `animate`
/// the path starts hidden (`stroke-dashoffset` equal to the dash length)
/// and is revealed over the animation's duration; without it the path is
/// written fully drawn. An empty drawing still produces a valid document
/// with no `<path>`.
#[must_use]
pub fn to_svg(rendered: &RenderedPath, metadata: &SvgMetadata<'_>, animate: bool) -> String {
    let dimensions = rendered.dimensions();
    let (w, h) = (dimensions.width, dimensions.height);
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if !rendered.data().is_empty() {
        let reveal = rendered.animation();
        let dash = reveal.dash_length();
        let mut path = Path::new()
            .set("d", rendered.data())
            .set("fill", "none")
            .set("stroke", "grey")
            .set("stroke-width", 2)
            .set("stroke-linecap", "round")
            .set("stroke-linejoin", "round")
            .set("stroke-dasharray", dash)
            .set("stroke-dashoffset", if animate { dash } else { 0.0 });

        if animate {
            let mut animation = Animate::new()
                .set("attributeName", "stroke-dashoffset")
                .set("from", dash)
                .set("to", 0)
                .set("dur", format!("{}s", reveal.duration().as_secs_f64()))
                .set("fill", "freeze");
            animation = match reveal.easing().key_splines() {
                Some(splines) => animation
                    .set("calcMode", "spline")
                    .set("keyTimes", "0;1")
                    .set("keySplines", splines),
                None => animation.set("calcMode", "linear"),
            };
            path = path.add(animation);
        }

        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
