//! Builds canonical conversion requests from tensors and options.
//!
//! A `ConversionRequest` is the validated, backend-ready form of a conversion:
//! model flags describing inputs and outputs, converter flags describing the
//! target, and an optional debug-info blob. All validation happens here, before
//! any backend is contacted.

use prost::Message;
use tracing::debug;

use super::options::ConversionOptions;
use super::tensor::TensorDescriptor;
use crate::error::{LiteconvError, Result};
use crate::proto::{ConverterFlags, InputArray, ModelFlags, OperatorVersion};
use crate::shape::ShapeDescriptor;
use crate::types::OpsSet;

/// Validated conversion request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    model_flags: ModelFlags,
    converter_flags: ConverterFlags,
    debug_info: Option<Vec<u8>>,
}

/// A request serialized for the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRequest {
    pub model_flags: Vec<u8>,
    pub converter_flags: Vec<u8>,
    pub debug_info: Option<Vec<u8>>,
}

impl ConversionRequest {
    /// Build a request from graph tensors.
    ///
    /// Input names follow the graph naming convention unless the options
    /// select a SavedModel, in which case names are used as given.
    pub fn from_tensors(
        inputs: &[TensorDescriptor],
        outputs: &[TensorDescriptor],
        options: &ConversionOptions,
        debug_info: Option<Vec<u8>>,
    ) -> Result<Self> {
        let converter_flags = build_converter_flags(options)?;
        let mut model_flags = base_model_flags(options);
        let from_saved_model = options.uses_saved_model();

        if let Some(shapes) = &options.input_shapes {
            if shapes.len() != inputs.len() {
                return Err(LiteconvError::validation(
                    "input_shapes",
                    format!(
                        "expected {} shapes (one per input), got {}",
                        inputs.len(),
                        shapes.len()
                    ),
                ));
            }
        }

        let requires_stats = converter_flags.requires_input_stats();
        for (idx, tensor) in inputs.iter().enumerate() {
            let data_type = tensor.element_type()?.to_io_data_type()?;
            let shape = match &options.input_shapes {
                Some(shapes) => &shapes[idx],
                None => &tensor.shape,
            };
            let (mean_value, std_value) = if requires_stats {
                let (mean, std) = options.required_input_stats(idx)?;
                (Some(mean), Some(std))
            } else {
                (None, None)
            };

            model_flags.input_arrays.push(InputArray {
                name: Some(tensor.array_name(from_saved_model)?),
                mean_value,
                std_value,
                data_type: Some(data_type as i32),
                shape: Some(shape.to_proto()?),
            });
        }

        for tensor in outputs {
            model_flags
                .output_arrays
                .push(tensor.array_name(from_saved_model)?);
        }

        debug!(
            inputs = model_flags.input_arrays.len(),
            outputs = model_flags.output_arrays.len(),
            saved_model = from_saved_model,
            "Built conversion request from tensors"
        );

        Ok(Self {
            model_flags,
            converter_flags,
            debug_info,
        })
    }

    /// Build a request from raw `(name, shape)` pairs and output names.
    ///
    /// Used when the source graph cannot be loaded, so neither element types
    /// nor the naming convention apply; names are used verbatim and every
    /// shape has a known rank.
    pub fn from_arrays_with_shape<S: AsRef<str>>(
        inputs: &[(String, Vec<i64>)],
        outputs: &[S],
        options: &ConversionOptions,
    ) -> Result<Self> {
        let converter_flags = build_converter_flags(options)?;
        let mut model_flags = base_model_flags(options);

        let requires_stats = converter_flags.requires_input_stats();
        for (idx, (name, dims)) in inputs.iter().enumerate() {
            let (mean_value, std_value) = if requires_stats {
                let (mean, std) = options.required_input_stats(idx)?;
                (Some(mean), Some(std))
            } else {
                (None, None)
            };

            model_flags.input_arrays.push(InputArray {
                name: Some(name.clone()),
                mean_value,
                std_value,
                data_type: None,
                shape: Some(ShapeDescriptor::from_signed(dims)?.to_proto()?),
            });
        }

        model_flags
            .output_arrays
            .extend(outputs.iter().map(|name| name.as_ref().to_string()));

        debug!(
            inputs = model_flags.input_arrays.len(),
            outputs = model_flags.output_arrays.len(),
            "Built conversion request from named arrays"
        );

        Ok(Self {
            model_flags,
            converter_flags,
            debug_info: None,
        })
    }

    /// Build a request that converts a SavedModel directory.
    ///
    /// Input and output arrays come from the SavedModel signatures, so only
    /// the locator fields are set on the model flags.
    pub fn from_saved_model(options: &ConversionOptions) -> Result<Self> {
        if !options.uses_saved_model() {
            return Err(LiteconvError::validation(
                "saved_model_dir",
                "a SavedModel directory is required",
            ));
        }
        let converter_flags = build_converter_flags(options)?;
        let model_flags = ModelFlags {
            saved_model_dir: options.saved_model_dir.clone(),
            saved_model_version: Some(options.saved_model_version),
            saved_model_tags: options.saved_model_tags.clone(),
            saved_model_exported_names: options.saved_model_exported_names.clone(),
            ..Default::default()
        };

        debug!(
            dir = ?model_flags.saved_model_dir,
            tags = model_flags.saved_model_tags.len(),
            "Built SavedModel conversion request"
        );

        Ok(Self {
            model_flags,
            converter_flags,
            debug_info: None,
        })
    }

    pub fn model_flags(&self) -> &ModelFlags {
        &self.model_flags
    }

    pub fn converter_flags(&self) -> &ConverterFlags {
        &self.converter_flags
    }

    pub fn debug_info(&self) -> Option<&[u8]> {
        self.debug_info.as_deref()
    }

    /// Serialize the request for the backend.
    pub fn encode(&self) -> EncodedRequest {
        EncodedRequest {
            model_flags: self.model_flags.encode_to_vec(),
            converter_flags: self.converter_flags.encode_to_vec(),
            debug_info: self.debug_info.clone(),
        }
    }
}

/// Model flags shared by every tensor-based request.
fn base_model_flags(options: &ConversionOptions) -> ModelFlags {
    let saved_model_dir = options
        .saved_model_dir
        .clone()
        .filter(|dir| !dir.is_empty());
    ModelFlags {
        change_concat_input_ranges: Some(options.change_concat_input_ranges),
        allow_nonexistent_arrays: Some(options.allow_nonexistent_arrays),
        saved_model_dir,
        saved_model_version: Some(options.saved_model_version),
        saved_model_tags: options.saved_model_tags.clone(),
        saved_model_exported_names: options.saved_model_exported_names.clone(),
        ..Default::default()
    }
}

/// Translate options into converter flags.
pub fn build_converter_flags(options: &ConversionOptions) -> Result<ConverterFlags> {
    let inference_type = options.inference_type.to_io_data_type()?;
    let inference_input_type = options.effective_inference_input_type().to_io_data_type()?;

    let mut flags = ConverterFlags {
        input_format: Some(options.input_format.to_proto() as i32),
        output_format: Some(options.output_format.to_proto() as i32),
        inference_type: Some(inference_type as i32),
        inference_input_type: Some(inference_input_type as i32),
        drop_control_dependency: Some(options.drop_control_dependency),
        reorder_across_fake_quant: Some(options.reorder_across_fake_quant),
        allow_custom_ops: Some(options.allow_custom_ops),
        custom_opdefs: options.custom_opdefs.clone(),
        select_user_tf_ops: options.select_user_tf_ops.clone(),
        post_training_quantize: Some(options.post_training_quantize),
        quantize_to_float16: Some(options.quantize_to_float16),
        dump_graphviz_dir: options.dump_graphviz_dir.clone(),
        dump_graphviz_include_video: Some(options.dump_graphviz_video),
        conversion_summary_dir: options.conversion_summary_dir.clone(),
        ..Default::default()
    };

    if let Some((min, max)) = options.default_ranges_stats {
        if min > max {
            return Err(LiteconvError::validation(
                "default_ranges_stats",
                format!("min {min} is greater than max {max}"),
            ));
        }
        flags.default_ranges_min = Some(min);
        flags.default_ranges_max = Some(max);
    }

    if let Some(target_ops) = &options.target_ops {
        if target_ops.contains(&OpsSet::SelectTfOps) {
            flags.enable_select_tf_ops = Some(true);
            if target_ops.len() == 1 {
                flags.force_select_tf_ops = Some(true);
            }
        }
    }

    flags.operators_versions = options
        .operators_versions
        .iter()
        .map(|(op_id, version)| OperatorVersion {
            op_id: Some(*op_id),
            op_version: Some(*version),
        })
        .collect();

    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::IoDataType;
    use crate::types::ElementType;
    use std::collections::BTreeSet;

    fn image_input() -> TensorDescriptor {
        TensorDescriptor::new(
            "input:0",
            ElementType::Float32,
            ShapeDescriptor::from_dims([Some(1), Some(224), Some(224), Some(3)]),
        )
    }

    #[test]
    fn test_default_request() {
        let request = ConversionRequest::from_tensors(
            &[image_input()],
            &[TensorDescriptor::output("output")],
            &ConversionOptions::default(),
            None,
        )
        .unwrap();

        let flags = request.converter_flags();
        assert_eq!(flags.allow_custom_ops, Some(false));
        assert_eq!(flags.inference_type, Some(IoDataType::Float as i32));
        assert_eq!(flags.inference_input_type, flags.inference_type);

        let model = request.model_flags();
        assert_eq!(model.input_arrays.len(), 1);
        let input = &model.input_arrays[0];
        assert_eq!(input.name.as_deref(), Some("input"));
        let shape = input.shape.as_ref().unwrap();
        assert_eq!(shape.unknown_rank, Some(false));
        assert_eq!(shape.dims, vec![1, 224, 224, 3]);
        assert_eq!(model.output_arrays, vec!["output".to_string()]);
    }

    #[test]
    fn test_inference_input_type_defaults() {
        for ty in [ElementType::Float16, ElementType::Int32, ElementType::Int8] {
            let options = ConversionOptions {
                inference_type: ty,
                post_training_quantize: true,
                ..Default::default()
            };
            let flags = build_converter_flags(&options).unwrap();
            assert_eq!(flags.inference_input_type, flags.inference_type);
        }
    }

    #[test]
    fn test_explicit_inference_input_type() {
        let options = ConversionOptions {
            inference_input_type: Some(ElementType::Int64),
            ..Default::default()
        };
        let flags = build_converter_flags(&options).unwrap();
        assert_eq!(flags.inference_type, Some(IoDataType::Float as i32));
        assert_eq!(flags.inference_input_type, Some(IoDataType::Int64 as i32));
    }

    #[test]
    fn test_quantized_without_stats_fails() {
        let options = ConversionOptions {
            inference_type: ElementType::UInt8,
            ..Default::default()
        };
        let err = ConversionRequest::from_tensors(&[image_input()], &[], &options, None)
            .unwrap_err();
        assert!(matches!(err, LiteconvError::Validation { ref field, .. } if field == "quantized_input_stats"));
    }

    #[test]
    fn test_quantized_input_type_only_requires_stats() {
        let options = ConversionOptions {
            inference_input_type: Some(ElementType::Int8),
            ..Default::default()
        };
        assert!(ConversionRequest::from_tensors(&[image_input()], &[], &options, None).is_err());
    }

    #[test]
    fn test_post_training_quantize_skips_stats() {
        let options = ConversionOptions {
            inference_type: ElementType::UInt8,
            post_training_quantize: true,
            ..Default::default()
        };
        let request =
            ConversionRequest::from_tensors(&[image_input()], &[], &options, None).unwrap();
        assert_eq!(request.model_flags().input_arrays[0].mean_value, None);
    }

    #[test]
    fn test_stats_assigned_in_order() {
        let second = TensorDescriptor::new(
            "mask:0",
            ElementType::UInt8,
            ShapeDescriptor::from_dims([Some(1), Some(4)]),
        );
        let options = ConversionOptions {
            inference_type: ElementType::UInt8,
            quantized_input_stats: Some(vec![(127.5, 127.5), (0.0, 1.0)]),
            ..Default::default()
        };
        let request =
            ConversionRequest::from_tensors(&[image_input(), second], &[], &options, None)
                .unwrap();
        let arrays = &request.model_flags().input_arrays;
        assert_eq!((arrays[0].mean_value, arrays[0].std_value), (Some(127.5), Some(127.5)));
        assert_eq!((arrays[1].mean_value, arrays[1].std_value), (Some(0.0), Some(1.0)));
    }

    #[test]
    fn test_too_few_stats_fails() {
        let options = ConversionOptions {
            inference_type: ElementType::UInt8,
            quantized_input_stats: Some(vec![(127.5, 127.5)]),
            ..Default::default()
        };
        let inputs = [image_input(), image_input()];
        assert!(ConversionRequest::from_tensors(&inputs, &[], &options, None).is_err());
    }

    #[test]
    fn test_unknown_rank_and_dims() {
        let inputs = [
            TensorDescriptor::new("a", ElementType::Float32, ShapeDescriptor::UnknownRank),
            TensorDescriptor::new(
                "b",
                ElementType::Float32,
                ShapeDescriptor::from_dims([None, Some(8)]),
            ),
        ];
        let request = ConversionRequest::from_tensors(
            &inputs,
            &[],
            &ConversionOptions::default(),
            None,
        )
        .unwrap();
        let arrays = &request.model_flags().input_arrays;
        let a = arrays[0].shape.as_ref().unwrap();
        assert_eq!(a.unknown_rank, Some(true));
        assert!(a.dims.is_empty());
        let b = arrays[1].shape.as_ref().unwrap();
        assert_eq!(b.unknown_rank, Some(false));
        assert_eq!(b.dims, vec![-1, 8]);
    }

    #[test]
    fn test_input_shapes_override() {
        let options = ConversionOptions {
            input_shapes: Some(vec![ShapeDescriptor::from_dims([Some(4), Some(2)])]),
            ..Default::default()
        };
        let request =
            ConversionRequest::from_tensors(&[image_input()], &[], &options, None).unwrap();
        assert_eq!(
            request.model_flags().input_arrays[0].shape.as_ref().unwrap().dims,
            vec![4, 2]
        );

        let mismatched = ConversionOptions {
            input_shapes: Some(Vec::new()),
            ..Default::default()
        };
        assert!(ConversionRequest::from_tensors(&[image_input()], &[], &mismatched, None).is_err());
    }

    #[test]
    fn test_unresolved_element_type_fails() {
        let unknown = TensorDescriptor {
            name: "x".into(),
            dtype: None,
            shape: ShapeDescriptor::UnknownRank,
        };
        let err = ConversionRequest::from_tensors(&[unknown], &[], &ConversionOptions::default(), None)
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_select_ops_only() {
        let options = ConversionOptions {
            target_ops: Some(BTreeSet::from([OpsSet::SelectTfOps])),
            ..Default::default()
        };
        let flags = build_converter_flags(&options).unwrap();
        assert_eq!(flags.enable_select_tf_ops, Some(true));
        assert_eq!(flags.force_select_tf_ops, Some(true));
    }

    #[test]
    fn test_builtins_and_select_ops() {
        let options = ConversionOptions {
            target_ops: Some(BTreeSet::from([OpsSet::TfliteBuiltins, OpsSet::SelectTfOps])),
            ..Default::default()
        };
        let flags = build_converter_flags(&options).unwrap();
        assert_eq!(flags.enable_select_tf_ops, Some(true));
        assert_ne!(flags.force_select_tf_ops, Some(true));
    }

    #[test]
    fn test_builtins_only() {
        let options = ConversionOptions {
            target_ops: Some(BTreeSet::from([OpsSet::TfliteBuiltins])),
            ..Default::default()
        };
        let flags = build_converter_flags(&options).unwrap();
        assert_eq!(flags.enable_select_tf_ops, None);
        assert_eq!(flags.force_select_tf_ops, None);
    }

    #[test]
    fn test_forwarded_flags() {
        let options = ConversionOptions {
            default_ranges_stats: Some((-1.0, 1.0)),
            custom_opdefs: vec!["name: 'MyOp'".into()],
            select_user_tf_ops: vec!["MyTfOp".into()],
            dump_graphviz_dir: Some("/tmp/dot".into()),
            dump_graphviz_video: true,
            conversion_summary_dir: Some("/tmp/summary".into()),
            operators_versions: [(3, 2), (1, 4)].into_iter().collect(),
            ..Default::default()
        };
        let flags = build_converter_flags(&options).unwrap();
        assert_eq!(flags.default_ranges_min, Some(-1.0));
        assert_eq!(flags.default_ranges_max, Some(1.0));
        assert_eq!(flags.custom_opdefs, vec!["name: 'MyOp'".to_string()]);
        assert_eq!(flags.select_user_tf_ops, vec!["MyTfOp".to_string()]);
        assert_eq!(flags.dump_graphviz_dir.as_deref(), Some("/tmp/dot"));
        assert_eq!(flags.dump_graphviz_include_video, Some(true));
        assert_eq!(flags.conversion_summary_dir.as_deref(), Some("/tmp/summary"));
        let versions: Vec<_> = flags
            .operators_versions
            .iter()
            .map(|v| (v.op_id, v.op_version))
            .collect();
        assert_eq!(versions, vec![(Some(1), Some(4)), (Some(3), Some(2))]);
    }

    #[test]
    fn test_inverted_default_ranges_rejected() {
        let options = ConversionOptions {
            default_ranges_stats: Some((6.0, 0.0)),
            ..Default::default()
        };
        assert!(build_converter_flags(&options).unwrap_err().is_config_error());
    }

    #[test]
    fn test_arrays_with_shape() {
        let request = ConversionRequest::from_arrays_with_shape(
            &[("input".to_string(), vec![1, 16, 16, 3])],
            &["out"],
            &ConversionOptions::default(),
        )
        .unwrap();
        let model = request.model_flags();
        assert_eq!(model.input_arrays[0].name.as_deref(), Some("input"));
        assert_eq!(model.input_arrays[0].shape.as_ref().unwrap().dims, vec![1, 16, 16, 3]);
        assert_eq!(model.output_arrays, vec!["out".to_string()]);
    }

    #[test]
    fn test_arrays_with_shape_requires_stats() {
        let options = ConversionOptions {
            inference_type: ElementType::Int8,
            ..Default::default()
        };
        let arrays = [("input".to_string(), vec![1, 3])];
        let err =
            ConversionRequest::from_arrays_with_shape(&arrays, &["out"], &options).unwrap_err();
        assert!(err.is_config_error());

        let options = ConversionOptions {
            quantized_input_stats: Some(vec![(0.5, 2.0)]),
            ..options
        };
        let request =
            ConversionRequest::from_arrays_with_shape(&arrays, &["out"], &options).unwrap();
        assert_eq!(request.model_flags().input_arrays[0].std_value, Some(2.0));
    }

    #[test]
    fn test_saved_model_request() {
        let options = ConversionOptions {
            saved_model_dir: Some("/models/resnet".into()),
            saved_model_version: 1,
            saved_model_tags: vec!["serve".into()],
            saved_model_exported_names: vec!["serving_default".into()],
            ..Default::default()
        };
        let request = ConversionRequest::from_saved_model(&options).unwrap();
        let model = request.model_flags();
        assert_eq!(model.saved_model_dir.as_deref(), Some("/models/resnet"));
        assert_eq!(model.saved_model_version, Some(1));
        assert_eq!(model.saved_model_tags, vec!["serve".to_string()]);
        assert!(model.input_arrays.is_empty());

        assert!(ConversionRequest::from_saved_model(&ConversionOptions::default()).is_err());
    }

    #[test]
    fn test_encode_decodes_back() {
        let request = ConversionRequest::from_tensors(
            &[image_input()],
            &[TensorDescriptor::output("output:0")],
            &ConversionOptions::default(),
            Some(b"debug".to_vec()),
        )
        .unwrap();
        let encoded = request.encode();
        let model = ModelFlags::decode(encoded.model_flags.as_slice()).unwrap();
        let flags = ConverterFlags::decode(encoded.converter_flags.as_slice()).unwrap();
        assert_eq!(&model, request.model_flags());
        assert_eq!(&flags, request.converter_flags());
        assert_eq!(encoded.debug_info.as_deref(), Some(&b"debug"[..]));
    }

    #[test]
    fn test_dimension_below_sentinel_rejected() {
        let input = TensorDescriptor::new(
            "x",
            ElementType::Float32,
            ShapeDescriptor::Dims(vec![1, -7]),
        );
        let err = ConversionRequest::from_tensors(
            &[input],
            &[TensorDescriptor::output("y")],
            &ConversionOptions::default(),
            None,
        )
        .unwrap_err();
        assert!(err.is_config_error());
    }
}
