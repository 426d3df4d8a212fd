//! Data layers: graph sources fed by the data provider.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::ConfigSection;
use crate::error::{CompileError, Result};
use crate::layers::base::{header, non_negative};
use crate::layers::{BuildContext, LayerDescriptor, LayerKind, LayerParser};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataLayer {
    /// Index of the data channel this layer exposes.
    pub data_idx: usize,
}

/// Parser for `type = data`. Width comes from the shape oracle.
pub struct DataParser;

impl LayerParser for DataParser {
    fn parse(
        &self,
        section: &ConfigSection,
        _prev: &[LayerDescriptor],
        ctx: &mut BuildContext<'_>,
    ) -> Result<LayerDescriptor> {
        let (name, layer_type) = header(section)?;
        let data_idx = non_negative(section, "dataIdx")?;
        let num_outputs = match ctx.oracle.data_dims(data_idx) {
            Some(0) => {
                return Err(CompileError::constraint(
                    name,
                    "dataIdx",
                    format!("refers to data channel {data_idx}, which has no dimensions"),
                ))
            }
            Some(width) => width,
            None => {
                return Err(CompileError::constraint(
                    name,
                    "dataIdx",
                    format!("refers to data channel {data_idx}, which the data provider does not have"),
                ))
            }
        };

        info!("Initialized data layer '{}', producing {} outputs", name, num_outputs);
        Ok(LayerDescriptor {
            name,
            layer_type,
            inputs: Vec::new(),
            num_inputs: Vec::new(),
            num_outputs,
            kind: LayerKind::Data(DataLayer { data_idx }),
        })
    }
}
