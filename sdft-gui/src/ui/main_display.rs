//! # Main Display Module
//!
//! Layout of the main window: level bars and readout on top, keyboard below,
//! settings sidebar on the right.

use iced::widget::{button, column, container, horizontal_space, row, slider, text, Space};
use iced::{Alignment, Element, Length};
use sdft_core::config::MAX_SMOOTHING_SECONDS;

use super::{level_bars, piano_keyboard};
use crate::{AppDisplayData, Message};

/// A sidebar button: label and the message it sends.
struct ButtonConfig {
    label: &'static str,
    message: Message,
}

const SETTINGS_CONFIG: &[(&str, &[ButtonConfig])] = &[
    (
        "Tools",
        &[
            ButtonConfig { label: "Level bars", message: Message::ToggleLevelBars },
            ButtonConfig { label: "Keyboard", message: Message::ToggleKeyboard },
            ButtonConfig { label: "Readout", message: Message::ToggleReadout },
        ],
    ),
    (
        "Program",
        &[
            ButtonConfig { label: "Save Config", message: Message::SaveConfig },
            ButtonConfig { label: "Load Config", message: Message::LoadConfig },
        ],
    ),
];

pub fn create_main_view(data: &AppDisplayData) -> Element<'static, Message> {
    let title = text("Piano Spectrum").size(28);

    let level_bars_panel = create_level_bars_panel(data);
    let readout_panel = create_readout_panel(data);
    let keyboard_panel = create_keyboard_panel(data);

    let top_row = match (level_bars_panel, readout_panel) {
        (Some(l), Some(r)) => row![l, Space::with_width(10), r],
        (Some(l), None) => row![l],
        (None, Some(r)) => row![r],
        (None, None) => row![],
    }
    .align_y(Alignment::Start);

    let mut content = column![title, text(data.status.clone()).size(14), Space::with_height(10), top_row]
        .width(Length::Fill)
        .spacing(10);
    if let Some(keyboard) = keyboard_panel {
        content = content.push(keyboard);
    }

    let main_content = row![content, Space::with_width(10), create_sidebar(data)]
        .align_y(Alignment::Start)
        .padding(20);

    container(main_content)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn create_level_bars_panel(data: &AppDisplayData) -> Option<Element<'static, Message>> {
    if !data.level_bars_visible {
        return None;
    }

    let bars = container(level_bars::LevelBars::new(data.levels.clone(), data.selected_key).view())
        .width(Length::Fill)
        .height(Length::Fill);

    let panel = container(
        column![text("Levels").size(18), Space::with_height(10), bars]
            .spacing(5)
            .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fixed(250.0));

    Some(panel.into())
}

/// The pinned key if there is one, otherwise the loudest key.
fn focused_key(data: &AppDisplayData) -> Option<usize> {
    data.selected_key.or_else(|| {
        data.levels
            .iter()
            .enumerate()
            .filter(|&(_, &level)| level > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(key, _)| key)
    })
}

fn create_readout_panel(data: &AppDisplayData) -> Option<Element<'static, Message>> {
    if !data.readout_visible {
        return None;
    }

    let details = data.layout.as_ref().zip(focused_key(data)).and_then(|(layout, key)| {
        let bin = layout.bins.get(key)?;
        let name = layout.names.get(key)?.clone();
        let level = data.levels.get(key).copied().unwrap_or(0.0);
        let sample_rate = f64::from(layout.sample_rate);
        Some((
            name,
            format!("{:.2} Hz", bin.frequency),
            format!("{:.2}", level),
            format!(
                "k = {}, N = {} ({:+.2} cents)",
                bin.k,
                bin.n,
                bin.quantization_cents(sample_rate)
            ),
        ))
    });
    let (note_name, freq_text, level_text, bin_text) = details.unwrap_or_else(|| {
        (
            "--".to_string(),
            "0.00 Hz".to_string(),
            "0.00".to_string(),
            String::new(),
        )
    });

    let pinned = if data.selected_key.is_some() { "Pinned" } else { "Loudest" };

    let readout_content = column![
        row![text("Key").size(14), horizontal_space(), text(pinned).size(14)],
        row![
            text(note_name).size(32),
            Space::with_width(10),
            text(freq_text).size(24),
            horizontal_space(),
            container(text(level_text).size(24)).padding([4, 8]),
        ]
        .align_y(Alignment::Center),
        text(bin_text).size(14),
    ]
    .spacing(5);

    let panel = container(
        column![text("Readout").size(18), Space::with_height(10), readout_content]
            .spacing(5)
            .padding(15),
    )
    .width(Length::Fixed(320.0))
    .height(Length::Fixed(250.0));

    Some(panel.into())
}

fn create_keyboard_panel(data: &AppDisplayData) -> Option<Element<'static, Message>> {
    if !data.keyboard_visible {
        return None;
    }
    let layout = data.layout.as_ref()?;

    let black = layout.names.iter().map(|name| name.contains('#')).collect();
    let keyboard = piano_keyboard::PianoKeyboard::new(black, data.levels.clone(), data.selected_key);

    let panel = container(
        column![
            text("Keyboard").size(18),
            Space::with_height(10),
            container(keyboard.view()).width(Length::Fill).height(Length::Fill)
        ]
        .spacing(5)
        .padding(15),
    )
    .width(Length::Fill)
    .height(Length::Fixed(200.0));

    Some(panel.into())
}

fn create_sidebar(data: &AppDisplayData) -> Element<'static, Message> {
    let mut sections = column![].spacing(10);

    for (title, buttons) in SETTINGS_CONFIG {
        let items = buttons.iter().fold(column![].spacing(8), |col, config| {
            col.push(
                button(text(config.label).size(14).width(Length::Fill))
                    .padding([6, 10])
                    .on_press(config.message.clone()),
            )
        });
        sections = sections.push(column![text(*title).size(18), Space::with_height(10), items].spacing(5));
    }

    let smoothing_ms = data.smoothing_seconds * 1000.0;
    sections = sections.push(
        column![
            text("Smoothing").size(18),
            Space::with_height(10),
            text(format!("{:.0} ms", smoothing_ms)).size(14),
            slider(
                0.0..=MAX_SMOOTHING_SECONDS,
                data.smoothing_seconds,
                Message::SmoothingChanged
            )
            .step(0.005),
        ]
        .spacing(5),
    );

    container(sections.padding(15))
        .width(Length::Fixed(250.0))
        .height(Length::Fill)
        .into()
}
