/// ArcFace face encoder using ONNX Runtime.
///
/// Embeds the tight crop of a detected face with the `w600k_r50` model and
/// returns the L2-normalized output.
use std::path::Path;

use crate::detection::infrastructure::execution_provider::build_session;
use crate::recognition::domain::face_embedding::FaceEmbedding;
use crate::recognition::domain::face_encoder::FaceEncoder;
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxArcFaceEncoder {
    session: ort::session::Session,
}

impl OnnxArcFaceEncoder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = build_session(model_path)?;
        log::info!("Face encoder ready ({})", model_path.display());
        Ok(Self { session })
    }
}

impl FaceEncoder for OnnxArcFaceEncoder {
    fn encode(
        &mut self,
        frame: &Frame,
        region: &FaceRegion,
    ) -> Result<FaceEmbedding, Box<dyn std::error::Error>> {
        let crop = frame.crop(region);
        if crop.width() == 0 || crop.height() == 0 {
            return Err(format!("Face region {region:?} lies outside the frame").into());
        }
        let rgb = crop.to_rgb();
        let tensor = preprocess(rgb.data(), rgb.width(), rgb.height());

        let input_value = ort::value::Tensor::from_array(tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let embedding_slice = embedding_array
            .as_slice()
            .ok_or("Cannot get embedding slice")?;
        if embedding_slice.is_empty() {
            return Err("Embedding model returned an empty vector".into());
        }

        Ok(FaceEmbedding::normalized(embedding_slice.to_vec()))
    }
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(rgb_data: &[u8], width: u32, height: u32) -> ndarray::Array4<f32> {
    let src_w = width as usize;
    let src_h = height as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));

    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            let offset = (src_y * src_w + src_x) * 3;
            if offset + 2 < rgb_data.len() {
                for c in 0..3 {
                    tensor[[0, c, y, x]] = (rgb_data[offset + c] as f32 - NORM_MEAN) / NORM_STD;
                }
            }
        }
    }

    tensor
}
