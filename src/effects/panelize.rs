//! Panelize: maps a 1-row strip onto a rows × cols panel.
//!
//! Every output pixel reads one input pixel through an index map that depends
//! on the pattern, the panel shape and the two displacement parameters. The
//! map is rebuilt in `update` whenever one of those changes.
//!
//! The effect asks for `2 * pixels / rows` input pixels on a single row, so
//! the resolution it requests upstream differs from what it produces.
//!
//! Diamond on an 8 × 8 panel, as input indices:
//!
//! ```text
//! 0 0 0 0 0 0 0 0
//! 0 0 0 1 1 0 0 0
//! 0 0 1 2 2 1 0 0
//! 0 1 2 3 3 2 1 0
//! ```

use crate::graph::parameter::read_f64;
use crate::graph::{
    Effect, EffectCore, EffectResult, GraphResult, ParameterDefinition, ParameterValues,
    PixelBuffer, Signal,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How strip positions spread over the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PanelPattern {
    Square,
    Batman,
    Ruby,
    Diamond,
}

impl PanelPattern {
    pub const ALL: [PanelPattern; 4] = [
        PanelPattern::Square,
        PanelPattern::Batman,
        PanelPattern::Ruby,
        PanelPattern::Diamond,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            PanelPattern::Square => "MakeSquare",
            PanelPattern::Batman => "MakeBatman",
            PanelPattern::Ruby => "MakeRuby",
            PanelPattern::Diamond => "MakeDiamond",
        }
    }

    /// Input index for panel position `(row, col)`.
    ///
    /// `col` may exceed the panel when displaced; positions are mirrored at
    /// the panel center and the result is clamped to `0..num_cols`.
    pub fn index_for(
        self,
        row: i64,
        col: i64,
        num_rows: usize,
        num_cols: usize,
        input_displacement: f64,
    ) -> usize {
        let rows = num_rows as f64;
        let cols = num_cols as f64;
        let dp = (input_displacement * cols) as i64;

        let adjusted_row = if row as f64 >= rows / 2.0 {
            num_rows as i64 - 1 - row
        } else {
            row
        };
        let adjusted_col = if col as f64 >= cols / 2.0 {
            num_cols as i64 - 1 - col
        } else {
            col
        };

        // Distance of a mirrored position from the center, truncated
        let inner = |half: f64, adjusted: i64, shift: f64| (half - adjusted as f64 + shift).abs() as i64;

        let index = match self {
            PanelPattern::Square => {
                let row_offset = inner(rows / 2.0, adjusted_row, 1.0);
                let col_offset = inner(cols / 2.0, adjusted_col, 1.0);
                (num_rows.max(num_cols) / 2) as i64 - row_offset.max(col_offset) + dp
            }
            PanelPattern::Batman | PanelPattern::Ruby => {
                let row_offset = inner(rows / 2.0, adjusted_row, -1.0);
                let col_offset = inner(cols / 2.0, adjusted_col, -1.0);
                let offset = if self == PanelPattern::Batman {
                    row_offset.min(col_offset)
                } else {
                    row_offset.max(col_offset)
                };
                adjusted_col.min(adjusted_row) - offset + dp
            }
            PanelPattern::Diamond => {
                let row_offset = inner(rows / 2.0, adjusted_row, -1.0);
                adjusted_col - row_offset + dp
            }
        };

        index.max(0).min(num_cols as i64 - 1).max(0) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MapKey {
    num_pixels: usize,
    num_rows: usize,
    displacement: f64,
    input_displacement: f64,
}

pub struct Panelize {
    core: EffectCore,
    pattern: PanelPattern,
    displacement: f64,
    input_displacement: f64,
    map: Vec<usize>,
    map_key: Option<MapKey>,
}

impl Panelize {
    pub fn new(pattern: PanelPattern) -> Self {
        Self {
            core: EffectCore::new(),
            pattern,
            displacement: 0.0,
            input_displacement: 0.5,
            map: Vec::new(),
            map_key: None,
        }
    }

    pub fn pattern(&self) -> PanelPattern {
        self.pattern
    }

    /// Current index map, row-major over the output panel.
    pub fn index_map(&self) -> &[usize] {
        &self.map
    }

    fn rebuild_map(&mut self, key: MapKey) {
        let num_rows = key.num_rows.max(1);
        let num_cols = key.num_pixels / num_rows;
        let dp = (key.displacement * num_cols as f64) as i64;

        tracing::debug!(
            "Generating {} map for {}x{} pixels",
            self.pattern.type_name(),
            num_rows,
            num_cols
        );
        let pattern = self.pattern;
        self.map = (0..num_rows)
            .flat_map(|row| (0..num_cols).map(move |col| (row, col)))
            .map(|(row, col)| {
                pattern.index_for(
                    row as i64,
                    col as i64 + dp,
                    num_rows,
                    num_cols,
                    key.input_displacement,
                )
            })
            .collect();
        self.map_key = Some(key);
    }
}

impl Effect for Panelize {
    fn type_name(&self) -> &'static str {
        self.pattern.type_name()
    }

    fn num_input_channels(&self) -> usize {
        1
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn num_input_pixels(&self, _channel: usize) -> Option<usize> {
        self.core
            .num_pixels()
            .map(|pixels| 2 * pixels / self.core.num_rows())
    }

    fn num_input_rows(&self, _channel: usize) -> usize {
        1
    }

    fn update(&mut self, _dt: f64) -> EffectResult {
        let Some(num_pixels) = self.core.num_pixels() else {
            return Ok(());
        };
        let key = MapKey {
            num_pixels,
            num_rows: self.core.num_rows(),
            displacement: self.modulated_parameter("displacement", self.displacement),
            input_displacement: self
                .modulated_parameter("input_displacement", self.input_displacement),
        };
        if self.map_key != Some(key) {
            self.rebuild_map(key);
        }
        Ok(())
    }

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        let input = inputs[0].as_ref().and_then(Signal::as_pixels);
        let (Some(input), Some(key)) = (input, self.map_key) else {
            outputs[0] = None;
            return Ok(());
        };

        let pixels = self
            .map
            .iter()
            .map(|&idx| input.pixels().get(idx).copied().unwrap_or([0.0; 3]))
            .collect();
        outputs[0] = Some(Signal::Pixels(PixelBuffer::from_pixels(pixels, key.num_rows)));
        Ok(())
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::new()
            .with("displacement", 0.0, 0.0, 1.0, 0.001)
            .with("input_displacement", 0.5, 0.0, 1.0, 0.001)
    }

    fn parameters(&self) -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("displacement".into(), Value::from(self.displacement));
        values.insert(
            "input_displacement".into(),
            Value::from(self.input_displacement),
        );
        values
    }

    fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        let displacement = read_f64(values, "displacement")?;
        let input_displacement = read_f64(values, "input_displacement")?;
        if let Some(displacement) = displacement {
            self.displacement = displacement;
        }
        if let Some(input_displacement) = input_displacement {
            self.input_displacement = input_displacement;
        }
        Ok(())
    }
}
