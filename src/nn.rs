//! Neural Network inference.

use std::{
    ops::{Index, RangeInclusive},
    path::Path,
    sync::Arc,
};

use anyhow::{anyhow, bail};
use tract_onnx::prelude::{
    tract_ndarray::Array4, tvec, Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, TValue, Tensor,
    TypedFact, TypedOp,
};

use crate::{
    image::{Color, Image, Rect},
    resolution::Resolution,
};

type Model = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A convolutional neural network (CNN) that operates on image data.
pub struct Cnn {
    nn: NeuralNetwork,
    shape: CnnInputShape,
    input_res: Resolution,
    color_mapper: ColorMapper,
}

impl Cnn {
    /// Creates a CNN wrapper from a [`NeuralNetwork`].
    ///
    /// The network must have exactly one input with a shape that matches the given
    /// [`CnnInputShape`].
    pub fn new(
        nn: NeuralNetwork,
        shape: CnnInputShape,
        color_mapper: ColorMapper,
    ) -> anyhow::Result<Self> {
        let input_res = Self::get_input_res(&nn, shape)?;
        Ok(Self {
            nn,
            shape,
            input_res,
            color_mapper,
        })
    }

    fn get_input_res(nn: &NeuralNetwork, shape: CnnInputShape) -> anyhow::Result<Resolution> {
        if nn.num_inputs() != 1 {
            bail!(
                "CNN network has to take exactly 1 input, this one takes {}",
                nn.num_inputs(),
            );
        }

        let tensor_shape = nn.input_shape(0)?;
        let (w, h) = match (shape, tensor_shape) {
            (CnnInputShape::NCHW, [1, 3, h, w]) | (CnnInputShape::NHWC, [1, h, w, 3]) => (*w, *h),
            _ => {
                bail!(
                    "invalid model input shape for {:?} CNN: {:?}",
                    shape,
                    tensor_shape,
                );
            }
        };

        let (w, h): (u32, u32) = (w.try_into()?, h.try_into()?);
        Ok(Resolution::new(w, h))
    }

    /// Returns the expected input image size.
    #[inline]
    pub fn input_resolution(&self) -> Resolution {
        self.input_res
    }

    /// Runs the network on the area of `image` covered by `rect`, returning the estimated outputs.
    ///
    /// The area is sampled to the network's input resolution. If its aspect ratio does not match
    /// the network's input aspect ratio, the image data will be stretched. Parts of `rect` outside
    /// of `image` are treated as black.
    pub fn estimate(&self, image: &Image, rect: Rect) -> anyhow::Result<Outputs> {
        let input = image.sample_rect(rect, self.input_res);
        let (h, w) = (
            self.input_res.height() as usize,
            self.input_res.width() as usize,
        );

        let map = |x: usize, y: usize, c: usize| {
            self.color_mapper.map(input.get(x as u32, y as u32))[c]
        };
        let tensor: Tensor = match self.shape {
            CnnInputShape::NCHW => Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| map(x, y, c)),
            CnnInputShape::NHWC => Array4::from_shape_fn((1, h, w, 3), |(_, y, x, c)| map(x, y, c)),
        }
        .into();

        self.nn.estimate(tensor)
    }
}

/// Maps 8-bit sRGB colors to the floating-point values a network expects.
#[derive(Debug, Clone)]
pub struct ColorMapper {
    target_range: RangeInclusive<f32>,
}

impl ColorMapper {
    /// Creates a color mapper that uniformly maps sRGB values to `target_range`.
    pub fn linear(target_range: RangeInclusive<f32>) -> Self {
        assert!(target_range.end() > target_range.start());
        Self { target_range }
    }

    fn map(&self, color: Color) -> [f32; 3] {
        let start = *self.target_range.start();
        let end = *self.target_range.end();

        let adjust_range = (end - start) / 255.0;
        color.rgb().map(|c| f32::from(c) * adjust_range + start)
    }
}

/// Describes in what order a CNN expects its input image data.
///
/// - `N` is the number of images, fixed at 1.
/// - `C` is the number of color channels, 3 for RGB inputs.
/// - `H` and `W` are the height and width of the input, respectively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum CnnInputShape {
    /// Shape is `(N, C, H, W)`.
    NCHW,
    /// Shape is `(N, H, W, C)`.
    NHWC,
}

/// Neural network loader, holding the raw ONNX model until [`Loader::load`] is called.
pub struct Loader {
    model_data: Vec<u8>,
    outputs: Option<Vec<usize>>,
}

impl Loader {

    /// Restricts the network outputs to the given indices, in that order.
    ///
    /// By default, all outputs of the model are computed and returned.
    pub fn with_output_selection<I: IntoIterator<Item = usize>>(mut self, outputs: I) -> Self {
        self.outputs = Some(outputs.into_iter().collect());
        self
    }

    /// Loads and optimizes the network.
    pub fn load(self) -> anyhow::Result<NeuralNetwork> {
        let graph = tract_onnx::onnx()
            .model_for_read(&mut self.model_data.as_slice())?
            .into_optimized()?;
        let outputs = graph.output_outlets()?;
        let selected_outputs = match self.outputs {
            Some(indices) => indices
                .iter()
                .map(|&i| {
                    outputs.get(i).copied().ok_or_else(|| {
                        anyhow!("output index {i} out of range (network has {})", outputs.len())
                    })
                })
                .collect::<anyhow::Result<Vec<_>>>()?,
            None => outputs.to_vec(),
        };
        let plan = SimplePlan::new_for_outputs(graph, &selected_outputs)?;

        Ok(NeuralNetwork { plan })
    }
}

/// A neural network that can be used for inference.
pub struct NeuralNetwork {
    plan: Model,
}

impl NeuralNetwork {
    /// Creates a loader for a pre-trained model read from an ONNX file path.
    ///
    /// The path must have a `.onnx` extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Loader> {
        Self::from_path_impl(path.as_ref())
    }

    fn from_path_impl(path: &Path) -> anyhow::Result<Loader> {
        match path.extension() {
            Some(ext) if ext == "onnx" => {}
            _ => bail!(
                "neural network file '{}' must have `.onnx` extension",
                path.display()
            ),
        }

        let model_data = std::fs::read(path)
            .map_err(|e| anyhow!("failed to read model '{}': {e}", path.display()))?;
        Ok(Loader {
            model_data,
            outputs: None,
        })
    }

    /// Returns the number of input nodes of the network.
    pub fn num_inputs(&self) -> usize {
        self.plan.model().inputs.len()
    }

    fn input_shape(&self, index: usize) -> anyhow::Result<&[usize]> {
        let fact = self.plan.model().input_fact(index)?;
        fact.shape
            .as_concrete()
            .ok_or_else(|| anyhow!("network input {index} has a symbolic shape"))
    }

    /// Runs the network on a single input tensor, returning the estimated outputs.
    #[doc(alias = "infer")]
    pub fn estimate(&self, input: Tensor) -> anyhow::Result<Outputs> {
        let outputs = self.plan.run(tvec![TValue::from_const(Arc::new(input))])?;
        Ok(Outputs {
            inner: outputs.into_iter().map(|v| v.into_tensor()).collect(),
        })
    }
}

/// The result of a neural network inference pass.
///
/// This is a list of tensors corresponding to the network's output nodes.
#[derive(Debug)]
pub struct Outputs {
    inner: Vec<Tensor>,
}

impl Outputs {
    /// Returns the number of tensors in this inference output.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over the output tensors.
    pub fn iter(&self) -> std::slice::Iter<'_, Tensor> {
        self.inner.iter()
    }
}

impl Index<usize> for Outputs {
    type Output = Tensor;

    fn index(&self, index: usize) -> &Tensor {
        &self.inner[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_mapper() {
        let mapper = ColorMapper::linear(-1.0..=1.0);
        assert_eq!(mapper.map(Color::BLACK), [-1.0, -1.0, -1.0]);
        assert_eq!(mapper.map(Color::WHITE), [1.0, 1.0, 1.0]);

        let mapper = ColorMapper::linear(0.0..=1.0);
        assert_eq!(mapper.map(Color::BLACK), [0.0, 0.0, 0.0]);
        assert_eq!(mapper.map(Color::RED), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_rejects_non_onnx_path() {
        let err = NeuralNetwork::from_path("models/palm_detection.tflite")
            .err()
            .unwrap();
        assert!(err.to_string().contains(".onnx"));
    }

    #[test]
    fn test_missing_model_file() {
        assert!(NeuralNetwork::from_path("does/not/exist.onnx").is_err());
    }
}
