use embedded_graphics::{
    draw_target::DrawTarget,
    geometry::{OriginDimensions, Point, Size},
    pixelcolor::{Rgb888, RgbColor},
    primitives::Rectangle,
    Pixel,
};
use std::convert::Infallible;

/// In-memory draw target. Stands in for a real panel, so the widget can run
/// (and be tested) on machines with no display attached.
#[derive(Clone, Debug)]
pub struct FrameBuffer {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: Size::new(width, height),
            pixels: vec![Rgb888::BLACK; (width * height) as usize],
        }
    }

    /// Color at a point, or `None` if it's off the buffer
    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        self.index(point).map(|index| self.pixels[index])
    }

    /// Number of pixels with exactly this color
    pub fn count(&self, color: Rgb888) -> usize {
        self.pixels.iter().filter(|&&pixel| pixel == color).count()
    }

    /// Smallest rectangle containing every pixel of this color
    pub fn extent(&self, color: Rgb888) -> Option<Rectangle> {
        let width = self.size.width as usize;
        let (mut min, mut max): (Option<Point>, Option<Point>) = (None, None);
        for (index, _) in self
            .pixels
            .iter()
            .enumerate()
            .filter(|(_, pixel)| **pixel == color)
        {
            let point =
                Point::new((index % width) as i32, (index / width) as i32);
            min = Some(min.map_or(point, |min| min.component_min(point)));
            max = Some(max.map_or(point, |max| max.component_max(point)));
        }
        Some(Rectangle::with_corners(min?, max?))
    }

    fn index(&self, point: Point) -> Option<usize> {
        let x = usize::try_from(point.x).ok()?;
        let y = usize::try_from(point.y).ok()?;
        let (width, height) =
            (self.size.width as usize, self.size.height as usize);
        (x < width && y < height).then_some(y * width + x)
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            // Anything off the buffer is dropped, like a real panel would
            if let Some(index) = self.index(point) {
                self.pixels[index] = color;
            }
        }
        Ok(())
    }
}
