use std::sync::Arc;

use serde::Serialize;

use crate::{
    interaction::{
        disclosure::{AnimationTarget, ExpandableCardState},
        hover::{Emphasis, HoverSelectionState},
    },
    timeline::{
        projector::{gridlines, hover_line, project_interval, Gridline, HoverLine},
        window::DayWindow,
    },
    usage::{aggregator::{color_index, AggregatedView}, format::format_duration, UsageInterval},
};

use super::config::{FULL_OPACITY, REDUCED_OPACITY};

/// One drawn interval of the chart. Fractions are already clamped to the window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSegment {
    pub identity: Arc<str>,
    pub color_index: usize,
    pub top_fraction: f64,
    pub height_fraction: f64,
    pub emphasis: Emphasis,
}

impl ChartSegment {
    pub fn opacity(&self) -> f64 {
        match self.emphasis {
            Emphasis::Full => FULL_OPACITY,
            Emphasis::Reduced => REDUCED_OPACITY,
        }
    }
}

/// One card of the ranked list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListEntry {
    pub color_index: usize,
    pub identity: Arc<str>,
    pub path: Arc<str>,
    pub formatted_duration: String,
    pub expanded: bool,
    pub animation: AnimationTarget,
    pub highlighted: bool,
    pub intervals: Vec<UsageInterval>,
}

/// Everything the presenter needs to draw a frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutModel {
    pub date_label: String,
    pub window: DayWindow,
    pub gridlines: Vec<Gridline>,
    pub segments: Vec<ChartSegment>,
    pub entries: Vec<ListEntry>,
    pub hover_line: Option<HoverLine>,
}

/// State the layout is derived from. Borrowed so building a frame never copies the view.
pub struct LayoutInputs<'a> {
    pub window: DayWindow,
    pub date_label: String,
    pub view: &'a AggregatedView,
    pub cards: &'a ExpandableCardState,
    pub hover: Option<&'a HoverSelectionState>,
    pub pointer: Option<f64>,
    pub palette_len: usize,
}

pub fn build_layout(inputs: LayoutInputs<'_>) -> LayoutModel {
    let LayoutInputs {
        window,
        date_label,
        view,
        cards,
        hover,
        pointer,
        palette_len,
    } = inputs;

    let emphasis = |identity: &str| hover.map_or(Emphasis::Full, |v| v.emphasis(identity));

    let segments = view
        .ranked()
        .flat_map(|(rank, record)| {
            let color_index = color_index(rank, palette_len);
            let segment_emphasis = emphasis(record.identity().as_ref());
            record.intervals().iter().filter_map(move |interval| {
                project_interval(*interval, &window).map(|geometry| ChartSegment {
                    identity: record.identity().clone(),
                    color_index,
                    top_fraction: geometry.top_fraction,
                    height_fraction: geometry.height_fraction,
                    emphasis: segment_emphasis,
                })
            })
        })
        .collect();

    let entries = view
        .ranked()
        .map(|(rank, record)| ListEntry {
            color_index: color_index(rank, palette_len),
            identity: record.identity().clone(),
            path: record.path().clone(),
            formatted_duration: format_duration(record.total_secs()),
            expanded: cards.is_expanded(record.identity()),
            animation: cards.animation_target(record.identity()),
            highlighted: hover.is_some_and(|v| v.is_active(record.identity())),
            intervals: record.intervals().to_vec(),
        })
        .collect();

    LayoutModel {
        date_label,
        window,
        gridlines: gridlines(),
        segments,
        entries,
        hover_line: pointer.map(|fraction| hover_line(fraction, &window)),
    }
}
