use std::convert::Infallible;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
    text::{Alignment, Baseline, Text, TextStyleBuilder},
};

use crate::image::{Color, Image};

/// Marker arms reach this many pixels away from the marked point.
const MARKER_REACH: i32 = 2;

enum Shape {
    Line(Point, Point),
    Circle(Point, u32),
    Marker(Point),
}

/// Guard returned by [`draw_line`], [`draw_circle`] and [`draw_marker`].
///
/// The shape is drawn when the guard is dropped, after the style methods have been applied.
pub struct DrawShape<'a> {
    image: &'a mut Image,
    shape: Shape,
    color: Color,
    stroke_width: u32,
    filled: bool,
}

impl DrawShape<'_> {
    fn new(image: &mut Image, shape: Shape, color: Color) -> DrawShape<'_> {
        DrawShape {
            image,
            shape,
            color,
            stroke_width: 1,
            filled: false,
        }
    }

    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the width of lines and outlines (1 by default).
    pub fn stroke_width(&mut self, width: u32) -> &mut Self {
        self.stroke_width = width;
        self
    }

    /// Fills circles instead of outlining them. Lines and markers are unaffected.
    pub fn filled(&mut self) -> &mut Self {
        self.filled = true;
        self
    }
}

impl Drop for DrawShape<'_> {
    fn drop(&mut self) {
        let image = &mut *self.image;
        let stroke = PrimitiveStyle::with_stroke(self.color, self.stroke_width);
        let result = match self.shape {
            Shape::Line(from, to) => Line::new(from, to).into_styled(stroke).draw(image),
            Shape::Circle(center, radius) => {
                let style = if self.filled {
                    PrimitiveStyle::with_fill(self.color)
                } else {
                    stroke
                };
                Circle::with_center(center, radius * 2 + 1)
                    .into_styled(style)
                    .draw(image)
            }
            Shape::Marker(at) => {
                // A small "x", one pixel wide regardless of the stroke width.
                let style = PrimitiveStyle::with_stroke(self.color, 1);
                let down = Point::new(MARKER_REACH, MARKER_REACH);
                let up = Point::new(MARKER_REACH, -MARKER_REACH);
                let first = Line::new(at - down, at + down).into_styled(style).draw(image);
                first.and(Line::new(at - up, at + up).into_styled(style).draw(image))
            }
        };
        result.unwrap_or_else(|never| match never {});
    }
}

/// Guard returned by [`draw_text`]; draws the text when dropped.
pub struct DrawText<'a> {
    image: &'a mut Image,
    position: Point,
    text: &'a str,
    color: Color,
    alignment: Alignment,
    baseline: Baseline,
}

impl DrawText<'_> {
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Makes `x` the left edge of the text instead of its center.
    pub fn align_left(&mut self) -> &mut Self {
        self.alignment = Alignment::Left;
        self
    }

    /// Makes `y` the bottom edge of the text instead of its middle.
    pub fn align_bottom(&mut self) -> &mut Self {
        self.baseline = Baseline::Bottom;
        self
    }
}

impl Drop for DrawText<'_> {
    fn drop(&mut self) {
        let style = TextStyleBuilder::new()
            .alignment(self.alignment)
            .baseline(self.baseline)
            .build();
        let font = MonoTextStyle::new(&FONT_10X20, self.color);
        Text::with_text_style(self.text, self.position, font, style)
            .draw(&mut *self.image)
            .unwrap_or_else(|never| match never {});
    }
}

/// Draws a straight line from `(x1, y1)` to `(x2, y2)` (blue unless recolored).
pub fn draw_line(image: &mut Image, x1: i32, y1: i32, x2: i32, y2: i32) -> DrawShape<'_> {
    let shape = Shape::Line(Point::new(x1, y1), Point::new(x2, y2));
    DrawShape::new(image, shape, Color::BLUE)
}

/// Draws a circle around `(x, y)` (green unless recolored).
pub fn draw_circle(image: &mut Image, x: i32, y: i32, radius: u32) -> DrawShape<'_> {
    DrawShape::new(image, Shape::Circle(Point::new(x, y), radius), Color::GREEN)
}

/// Marks a single landmark with a 5x5 "x" (red unless recolored).
pub fn draw_marker(image: &mut Image, x: i32, y: i32) -> DrawShape<'_> {
    DrawShape::new(image, Shape::Marker(Point::new(x, y)), Color::RED)
}

/// Draws `text` in a 10x20 pixel font, centered on `(x, y)` by default.
pub fn draw_text<'a>(image: &'a mut Image, x: i32, y: i32, text: &'a str) -> DrawText<'a> {
    DrawText {
        image,
        position: Point::new(x, y),
        text,
        color: Color::RED,
        alignment: Alignment::Center,
        baseline: Baseline::Middle,
    }
}

impl OriginDimensions for Image {
    fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

/// Pixels outside of the image are discarded.
impl DrawTarget for Image {
    type Color = Color;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Infallible>
    where
        I: IntoIterator<Item = Pixel<Color>>,
    {
        let (w, h) = (self.width(), self.height());
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < w && y < h {
                self.set(x, y, color);
            }
        }
        Ok(())
    }
}
