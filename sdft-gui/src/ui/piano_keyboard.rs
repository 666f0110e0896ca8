//! # Piano Keyboard Widget
//!
//! A keyboard whose keys light up with their current level. Works for any key
//! count; black keys are taken from the note names rather than assuming the
//! keyboard starts on a particular note.
//!
//! ## Features
//! - Key color blends toward blue as the level rises
//! - Click a key to pin it in the readout

use iced::widget::canvas::{self, event, Event, Fill, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Size, Theme};

const KEYBOARD_HEIGHT: f32 = 120.0;
const LIT_COLOR: Color = Color::from_rgb(0.204, 0.596, 0.859);
const SELECTED_COLOR: Color = Color::from_rgb(1.0, 0.2, 0.2);

#[derive(Debug, Clone)]
pub struct PianoKeyboard {
    /// One entry per key; `true` for sharps.
    black: Vec<bool>,
    levels: Vec<f32>,
    selected_key: Option<usize>,
}

impl PianoKeyboard {
    pub fn new(black: Vec<bool>, levels: Vec<f32>, selected_key: Option<usize>) -> Self {
        Self {
            black,
            levels,
            selected_key,
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fixed(KEYBOARD_HEIGHT)),
        )
        .into()
    }

    fn white_key_count(&self) -> usize {
        self.black.iter().filter(|&&black| !black).count().max(1)
    }

    /// Yields `(key, x)` for every black key, `x` being its left edge.
    fn black_keys(&self, white_key_width: f32) -> impl Iterator<Item = (usize, f32)> + '_ {
        let black_key_width = white_key_width * 0.6;
        let mut white_keys_seen = 0usize;
        self.black.iter().enumerate().filter_map(move |(key, &black)| {
            if black {
                Some((key, white_keys_seen as f32 * white_key_width - black_key_width / 2.0))
            } else {
                white_keys_seen += 1;
                None
            }
        })
    }

    fn key_color(&self, key: usize, base: Color) -> Color {
        if self.selected_key == Some(key) {
            return SELECTED_COLOR;
        }
        let level = self.levels.get(key).copied().unwrap_or(0.0).clamp(0.0, 1.0);
        Color::from_rgb(
            base.r + (LIT_COLOR.r - base.r) * level,
            base.g + (LIT_COLOR.g - base.g) * level,
            base.b + (LIT_COLOR.b - base.b) * level,
        )
    }

    fn key_index_from_pos(&self, bounds: Size, pos: Point) -> Option<usize> {
        let white_key_width = bounds.width / self.white_key_count() as f32;
        let black_key_width = white_key_width * 0.6;
        let black_key_height = bounds.height * 0.6;

        // Black keys are drawn on top, so they win.
        for (key, x) in self.black_keys(white_key_width) {
            let rect = Rectangle {
                x,
                y: 0.0,
                width: black_key_width,
                height: black_key_height,
            };
            if rect.contains(pos) {
                return Some(key);
            }
        }

        let clicked_white_key = (pos.x / white_key_width).floor() as usize;
        self.black
            .iter()
            .enumerate()
            .filter(|&(_, &black)| !black)
            .nth(clicked_white_key)
            .map(|(key, _)| key)
    }
}

impl<Message> canvas::Program<Message> for PianoKeyboard
where
    Message: From<crate::Message>,
{
    type State = ();

    fn update(
        &self,
        _state: &mut Self::State,
        event: Event,
        bounds: Rectangle,
        cursor: mouse::Cursor,
    ) -> (event::Status, Option<Message>) {
        if let Some(position) = cursor.position_in(bounds) {
            if let Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left)) = event {
                if let Some(key) = self.key_index_from_pos(bounds.size(), position) {
                    return (
                        event::Status::Captured,
                        Some(crate::Message::KeySelected(key).into()),
                    );
                }
            }
        }
        (event::Status::Ignored, None)
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        let white_key_width = bounds.width / self.white_key_count() as f32;
        let black_key_width = white_key_width * 0.6;
        let black_key_height = bounds.height * 0.6;

        let mut white_key_x = 0.0;
        for (key, _) in self.black.iter().enumerate().filter(|&(_, &black)| !black) {
            let origin = Point::new(white_key_x, 0.0);
            let size = Size::new(white_key_width, bounds.height);
            frame.fill_rectangle(origin, size, Fill::from(self.key_color(key, Color::WHITE)));
            frame.stroke(
                &Path::rectangle(origin, size),
                Stroke::default().with_color(Color::BLACK),
            );
            white_key_x += white_key_width;
        }

        for (key, x) in self.black_keys(white_key_width) {
            frame.fill_rectangle(
                Point::new(x, 0.0),
                Size::new(black_key_width, black_key_height),
                Fill::from(self.key_color(key, Color::BLACK)),
            );
        }

        vec![frame.into_geometry()]
    }
}
