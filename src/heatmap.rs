//! Position counts to heatmap points.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Placement counts keyed by x, then y
pub type PositionCounts = BTreeMap<u32, BTreeMap<u32, u32>>;

/// Reads counts whose coordinates arrive as string keys
pub fn deserialize_counts<'de, D>(de: D) -> Result<PositionCounts, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, BTreeMap<String, u32>> = Deserialize::deserialize(de)?;
    raw.into_iter()
        .map(|(x, column)| -> Result<(u32, BTreeMap<u32, u32>), D::Error> {
            let x = x.parse().map_err(D::Error::custom)?;
            let column = column
                .into_iter()
                .map(|(y, value)| y.parse().map(|y| (y, value)).map_err(D::Error::custom))
                .collect::<Result<_, _>>()?;
            Ok((x, column))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub x: u32,
    pub y: u32,
    pub value: u32,
}

/// Observer and sentry ward heatmaps for one player
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub obs: Vec<HeatPoint>,
    pub sen: Vec<HeatPoint>,
}

impl PositionData {
    pub fn generate(obs: &PositionCounts, sen: &PositionCounts) -> Self {
        Self {
            obs: heat_points(obs),
            sen: heat_points(sen),
        }
    }
}

pub fn heat_points(counts: &PositionCounts) -> Vec<HeatPoint> {
    counts
        .iter()
        .flat_map(|(&x, column)| {
            column
                .iter()
                .filter(|(_, &value)| value > 0)
                .map(move |(&y, &value)| HeatPoint { x, y, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn flattens_counts_in_coordinate_order() {
        let obs = btreemap! {
            80 => btreemap! { 120 => 2, 100 => 1 },
            64 => btreemap! { 70 => 5, 71 => 0 },
        };
        let data = PositionData::generate(&obs, &PositionCounts::new());

        assert_eq!(
            data.obs,
            vec![
                HeatPoint { x: 64, y: 70, value: 5 },
                HeatPoint { x: 80, y: 100, value: 1 },
                HeatPoint { x: 80, y: 120, value: 2 },
            ]
        );
        assert!(data.sen.is_empty());
    }
}
