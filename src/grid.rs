//! Tile grid model: group filter options and the visible tile list

use std::collections::BTreeSet;

use crate::config::ui::PLACEHOLDER_LOGO;
use crate::models::Station;

pub const ALL_GROUPS_LABEL: &str = "All groups";
pub const UNREACHABLE_LABEL: &str = "Unreachable";

/// Group selection; `All` shows every station
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GroupFilter {
    #[default]
    All,
    Group(String),
}

impl GroupFilter {
    pub fn matches(&self, station: &Station) -> bool {
        match self {
            GroupFilter::All => true,
            GroupFilter::Group(group) => station.group == *group,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            GroupFilter::All => ALL_GROUPS_LABEL,
            GroupFilter::Group(group) => group,
        }
    }
}

/// "All groups" followed by the distinct non-empty groups, sorted
pub fn group_options(stations: &[Station]) -> Vec<GroupFilter> {
    let groups: BTreeSet<&str> = stations
        .iter()
        .map(|s| s.group.as_str())
        .filter(|g| !g.is_empty())
        .collect();

    std::iter::once(GroupFilter::All)
        .chain(groups.into_iter().map(|g| GroupFilter::Group(g.to_string())))
        .collect()
}

/// Everything a tile needs to render itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileView<'a> {
    /// Position in the full collection, not in the filtered list
    pub index: usize,
    pub name: &'a str,
    pub logo: &'a str,
    pub group: Option<&'a str>,
    pub dimmed: bool,
    pub marker: Option<&'static str>,
}

impl<'a> TileView<'a> {
    fn new(index: usize, station: &'a Station) -> Self {
        let unreachable = station.is_unreachable();
        Self {
            index,
            name: &station.name,
            logo: if station.logo.is_empty() { PLACEHOLDER_LOGO } else { &station.logo },
            group: (!station.group.is_empty()).then_some(station.group.as_str()),
            dimmed: unreachable,
            marker: unreachable.then_some(UNREACHABLE_LABEL),
        }
    }
}

/// Tiles for the stations matching `filter`, in collection order
pub fn visible_tiles<'a>(stations: &'a [Station], filter: &GroupFilter) -> Vec<TileView<'a>> {
    stations
        .iter()
        .enumerate()
        .filter(|(_, station)| filter.matches(station))
        .map(|(index, station)| TileView::new(index, station))
        .collect()
}
