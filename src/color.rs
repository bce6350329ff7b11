use crate::rect::Edges;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0., 0., 0., 0.);
    pub const BLACK: Color = Color::rgba(0., 0., 0., 1.);
    pub const WHITE: Color = Color::rgba(1., 1., 1., 1.);

    pub const fn rgba(r: f64, g: f64, b: f64, a: f64) -> Color {
        Color { r, g, b, a }
    }
}

/// Something that can be drawn into a rectangle without being a view.
///
/// Backgrounds, foregrounds and borders are all drawables; each one becomes its own mountable
/// output.
#[derive(Debug, Clone, PartialEq)]
pub enum Drawable {
    /// Fills the bounds with a color.
    Color(Color),
    /// Strokes the inside of the bounds with per-edge widths.
    Border { widths: Edges, color: Color },
}

impl From<Color> for Drawable {
    fn from(color: Color) -> Drawable {
        Drawable::Color(color)
    }
}
