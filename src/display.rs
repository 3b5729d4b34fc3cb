use crate::style::{Family, Font, RenderStyle};
use anyhow::anyhow;
use embedded_graphics::{
    draw_target::{DrawTarget, DrawTargetExt},
    geometry::{Point, Size},
    mono_font::{iso_8859_1, MonoFont, MonoTextStyle},
    pixelcolor::Rgb888,
    primitives::Rectangle,
    text::{Alignment, Baseline, LineHeight, Text, TextStyleBuilder},
    Drawable,
};
use log::trace;
use std::{cmp, fmt::Debug, time::Duration};
use u8g2_fonts::{fonts, U8g2TextStyle};

/// Draws the widget's text container onto a target. Keeps track of what's
/// already on the target so unchanged frames aren't redrawn.
#[derive(Debug, Default)]
pub struct Display {
    /// The text currently on the target
    drawn: Option<TextItem>,
}

impl Display {
    /// How often a host should redraw
    pub const INTERVAL: Duration = Duration::from_millis(1000);

    /// The text most recently drawn, if any
    pub fn text(&self) -> Option<&str> {
        self.drawn.as_ref().map(|item| item.text.as_str())
    }

    /// Draw text in a container spanning the full width of the target,
    /// anchored top-left. If neither the text nor its style changed since the
    /// last draw, do nothing. Return whether anything was drawn.
    pub fn draw<D>(
        &mut self,
        target: &mut D,
        text: &str,
        style: RenderStyle,
    ) -> anyhow::Result<bool>
    where
        D: DrawTarget<Color = Rgb888>,
        D::Error: Debug,
    {
        let item = TextItem {
            text: text.to_owned(),
            style,
        };
        if self.drawn.as_ref() == Some(&item) {
            trace!("Text unchanged, skipping draw");
            return Ok(false);
        }
        trace!("Text changed: old={:?}; new={:?}", self.drawn, item);

        let bounds = target.bounding_box();
        let container = item.container(bounds);
        // Clear whatever the last frame covered too, it may have been taller
        let cleared_height = self
            .drawn
            .as_ref()
            .map_or(0, |drawn| drawn.container(bounds).size.height);
        let cleared = Rectangle::new(
            container.top_left,
            Size::new(
                container.size.width,
                cmp::max(container.size.height, cleared_height),
            ),
        );
        target
            .fill_solid(&cleared, style.background.into())
            .map_err(map_error)?;

        let text_style = TextStyleBuilder::new()
            .alignment(Alignment::Left)
            // Center each line in its line box, like CSS half-leading
            .baseline(Baseline::Middle)
            .line_height(LineHeight::Pixels(style.line_height))
            .build();
        // Past the bottom of the container plus a glyph, nothing is visible
        let offset = cmp::min(
            style.line_height / 2,
            container.size.height + style.font.size,
        );
        let position = container.top_left + Point::new(0, offset as i32);
        let color = style.color.into();
        let mut clipped = target.clipped(&container);
        let drawn = match CharacterStyle::new(style.font, color) {
            CharacterStyle::Proportional(character_style) => {
                Text::with_text_style(
                    &item.text,
                    position,
                    character_style,
                    text_style,
                )
                .draw(&mut clipped)
            }
            CharacterStyle::Mono(character_style) => Text::with_text_style(
                &item.text,
                position,
                character_style,
                text_style,
            )
            .draw(&mut clipped),
        };
        drawn.map_err(map_error)?;

        self.drawn = Some(item);
        Ok(true)
    }
}

#[derive(Clone, Debug, PartialEq)]
struct TextItem {
    text: String,
    style: RenderStyle,
}

impl TextItem {
    /// Full width of the target, one line box tall per line of text. Never
    /// extends past the bottom of the target.
    fn container(&self, bounds: Rectangle) -> Rectangle {
        let lines = cmp::max(self.text.lines().count(), 1) as u32;
        let height = self.style.line_height.saturating_mul(lines);
        Rectangle::new(
            bounds.top_left,
            Size::new(bounds.size.width, cmp::min(height, bounds.size.height)),
        )
    }
}

/// Glyph source for a [Font]. The u8g2 faces have no italics, so italic text
/// uses the ISO-8859-1 mono italics instead, whatever the family.
enum CharacterStyle {
    Proportional(U8g2TextStyle<Rgb888>),
    Mono(MonoTextStyle<'static, Rgb888>),
}

/// Pick the u8g2 face for a size, from the six sizes each family ships in
macro_rules! sized {
    (
        $size:expr,
        $color:expr;
        $f08:ident,
        $f10:ident,
        $f12:ident,
        $f14:ident,
        $f18:ident,
        $f24:ident $(,)?
    ) => {
        match $size {
            0..=8 => U8g2TextStyle::new(fonts::$f08, $color),
            9..=10 => U8g2TextStyle::new(fonts::$f10, $color),
            11..=12 => U8g2TextStyle::new(fonts::$f12, $color),
            13..=14 => U8g2TextStyle::new(fonts::$f14, $color),
            15..=18 => U8g2TextStyle::new(fonts::$f18, $color),
            _ => U8g2TextStyle::new(fonts::$f24, $color),
        }
    };
}

impl CharacterStyle {
    fn new(font: Font, color: Rgb888) -> Self {
        if font.italic {
            return Self::Mono(MonoTextStyle::new(
                Self::mono_italic(font.size),
                color,
            ));
        }

        let size = font.size;
        let style = match (font.family, font.bold) {
            (Family::Helvetica, false) => sized!(size, color;
                u8g2_font_helvR08_tf, u8g2_font_helvR10_tf,
                u8g2_font_helvR12_tf, u8g2_font_helvR14_tf,
                u8g2_font_helvR18_tf, u8g2_font_helvR24_tf,
            ),
            (Family::Helvetica, true) => sized!(size, color;
                u8g2_font_helvB08_tf, u8g2_font_helvB10_tf,
                u8g2_font_helvB12_tf, u8g2_font_helvB14_tf,
                u8g2_font_helvB18_tf, u8g2_font_helvB24_tf,
            ),
            (Family::Times, false) => sized!(size, color;
                u8g2_font_timR08_tf, u8g2_font_timR10_tf,
                u8g2_font_timR12_tf, u8g2_font_timR14_tf,
                u8g2_font_timR18_tf, u8g2_font_timR24_tf,
            ),
            (Family::Times, true) => sized!(size, color;
                u8g2_font_timB08_tf, u8g2_font_timB10_tf,
                u8g2_font_timB12_tf, u8g2_font_timB14_tf,
                u8g2_font_timB18_tf, u8g2_font_timB24_tf,
            ),
            (Family::Schoolbook, false) => sized!(size, color;
                u8g2_font_ncenR08_tf, u8g2_font_ncenR10_tf,
                u8g2_font_ncenR12_tf, u8g2_font_ncenR14_tf,
                u8g2_font_ncenR18_tf, u8g2_font_ncenR24_tf,
            ),
            (Family::Schoolbook, true) => sized!(size, color;
                u8g2_font_ncenB08_tf, u8g2_font_ncenB10_tf,
                u8g2_font_ncenB12_tf, u8g2_font_ncenB14_tf,
                u8g2_font_ncenB18_tf, u8g2_font_ncenB24_tf,
            ),
            (Family::Courier, false) => sized!(size, color;
                u8g2_font_courR08_tf, u8g2_font_courR10_tf,
                u8g2_font_courR12_tf, u8g2_font_courR14_tf,
                u8g2_font_courR18_tf, u8g2_font_courR24_tf,
            ),
            (Family::Courier, true) => sized!(size, color;
                u8g2_font_courB08_tf, u8g2_font_courB10_tf,
                u8g2_font_courB12_tf, u8g2_font_courB14_tf,
                u8g2_font_courB18_tf, u8g2_font_courB24_tf,
            ),
        };
        Self::Proportional(style)
    }

    fn mono_italic(size: u32) -> &'static MonoFont<'static> {
        match size {
            0..=12 => &iso_8859_1::FONT_6X13_ITALIC,
            13..=14 => &iso_8859_1::FONT_7X13_ITALIC,
            _ => &iso_8859_1::FONT_8X13_ITALIC,
        }
    }
}

/// Draw target errors don't have to implement Error, so map them manually
fn map_error<E: Debug>(error: E) -> anyhow::Error {
    anyhow!("{error:?}")
}
