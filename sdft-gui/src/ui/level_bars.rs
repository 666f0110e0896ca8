//! # Level Bars Widget
//!
//! One vertical bar per key, bass on the left. Levels are already normalized
//! to `[0, 1]`, so bars are drawn on a fixed linear scale rather than relative
//! to the loudest key; a quiet signal stays visibly quiet.

use iced::widget::canvas::{self, Geometry, Path, Stroke};
use iced::widget::container;
use iced::{mouse, Color, Element, Point, Rectangle, Renderer, Size, Theme};

const BAR_COLOR: Color = Color::from_rgb(0.204, 0.596, 0.859);
const HIGHLIGHT_COLOR: Color = Color::from_rgb(1.0, 0.2, 0.2);

pub struct LevelBars {
    levels: Vec<f32>,
    highlighted: Option<usize>,
}

impl LevelBars {
    pub fn new(levels: Vec<f32>, highlighted: Option<usize>) -> Self {
        Self {
            levels,
            highlighted,
        }
    }

    pub fn view(self) -> Element<'static, crate::Message> {
        container(
            canvas::Canvas::new(self)
                .width(iced::Length::Fill)
                .height(iced::Length::Fill),
        )
        .into()
    }
}

impl<Message> canvas::Program<Message> for LevelBars {
    type State = ();

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: mouse::Cursor,
    ) -> Vec<Geometry> {
        let mut frame = canvas::Frame::new(renderer, bounds.size());

        if !bounds.width.is_finite() || !bounds.height.is_finite() || self.levels.is_empty() {
            return vec![frame.into_geometry()];
        }

        // Guide lines at -6 dB steps: 1.0, 0.5, 0.25.
        for guide in [1.0f32, 0.5, 0.25] {
            let y = bounds.height * (1.0 - guide);
            frame.stroke(
                &Path::line(Point::new(0.0, y), Point::new(bounds.width, y)),
                Stroke::default().with_color(Color::from_rgba(1.0, 1.0, 1.0, 0.15)),
            );
        }

        let bar_width = bounds.width / self.levels.len() as f32;

        for (key, &level) in self.levels.iter().enumerate() {
            let height = level.clamp(0.0, 1.0) * bounds.height;
            if !(height.is_finite() && height > 0.0) {
                continue;
            }
            let color = if self.highlighted == Some(key) {
                HIGHLIGHT_COLOR
            } else {
                BAR_COLOR
            };
            let bar = Path::rectangle(
                Point::new(key as f32 * bar_width, bounds.height - height),
                Size::new((bar_width - 1.0).max(1.0), height),
            );
            frame.fill(&bar, color);
        }

        vec![frame.into_geometry()]
    }
}
