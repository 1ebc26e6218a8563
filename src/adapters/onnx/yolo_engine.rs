use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, Ix2, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::value::Value;
use regex::Regex;
use std::fs;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::application::frame::bgr_to_rgb;
use crate::domain::detection::BoxPrediction;
use crate::domain::frame::BgrFrame;
use crate::domain::model::YoloParams;

const COCO_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

pub struct OnnxYoloEngine {
    session: Session,
    names: Vec<String>,
    input_size: u32,
}

impl OnnxYoloEngine {
    pub fn load(path: &str, params: &YoloParams) -> Result<Self> {
        let mut builder = Session::builder()?.with_intra_threads(4)?;

        // CUDA es opcional: si está disponible se registra, si no continuamos en CPU.
        let cuda = CUDAExecutionProvider::default().build();
        if let Ok(builder_with_cuda) = builder.clone().with_execution_providers([cuda]) {
            builder = builder_with_cuda;
        }

        let model_bytes = fs::read(path).with_context(|| format!("reading model weights {}", path))?;
        let session = builder
            .commit_from_memory(&model_bytes)
            .with_context(|| format!("loading ONNX model {}", path))?;

        // Ultralytics exports carry `names` and `imgsz` as custom metadata
        let (names, imgsz) = match session.metadata() {
            Ok(meta) => (
                meta.custom("names").ok().flatten(),
                meta.custom("imgsz").ok().flatten(),
            ),
            Err(e) => {
                warn!("model metadata unavailable: {}", e);
                (None, None)
            }
        };

        let names = match names.as_deref().and_then(parse_names) {
            Some(names) => names,
            None => {
                warn!("no class names in model metadata, falling back to COCO");
                COCO_NAMES.iter().map(|n| n.to_string()).collect()
            }
        };
        let input_size = imgsz.as_deref().and_then(parse_imgsz).unwrap_or(params.input_size);

        info!(classes = names.len(), input_size, "ONNX model loaded from {}", path);

        Ok(Self { session, names, input_size })
    }

    pub fn class_names(&self) -> &[String] {
        &self.names
    }

    pub fn infer(&mut self, frame: &BgrFrame, params: &YoloParams) -> Result<Vec<BoxPrediction>> {
        // La red espera RGB
        let rgb = bgr_to_rgb(frame)?;

        let imgsz = self.input_size as usize;
        let resized = image::imageops::resize(&rgb, imgsz as u32, imgsz as u32, FilterType::Triangle);

        let mut input = Array4::<f32>::zeros((1, 3, imgsz, imgsz));
        for (x, y, pixel) in resized.enumerate_pixels() {
            input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
            input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
            input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
        }

        let input_shape = vec![1, 3, imgsz as i64, imgsz as i64];
        let (raw, _) = input.into_raw_vec_and_offset();
        let input_tensor = Value::from_array((input_shape, raw))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        if dims.len() != 3 || dims[1] < 5 {
            bail!("unexpected YOLO output shape {:?}, expected [1, 4 + classes, candidates]", dims);
        }
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;

        let scale = (
            frame.width as f32 / imgsz as f32,
            frame.height as f32 / imgsz as f32,
        );
        let candidates = decode_candidates(view, scale, (frame.width, frame.height), params.conf_threshold);

        let mut kept = non_max_suppression(candidates, params.iou_threshold);
        kept.truncate(params.max_detections);
        Ok(kept)
    }
}

/// Decodes a `[4 + nc, N]` YOLO head: `cx, cy, w, h` followed by per-class scores.
pub fn decode_candidates(
    view: ArrayView2<f32>,
    scale: (f32, f32),
    bounds: (u32, u32),
    conf_threshold: f32,
) -> Vec<BoxPrediction> {
    let (sx, sy) = scale;
    let (max_x, max_y) = (bounds.0 as f32, bounds.1 as f32);
    let mut out = Vec::new();

    for i in 0..view.shape()[1] {
        let scores = view.slice(s![4.., i]);
        let Some((class_id, score)) = scores
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f32)>, (c, s)| match best {
                Some((_, b)) if b >= s => best,
                _ => Some((c, s)),
            })
        else {
            continue;
        };

        if score < conf_threshold {
            continue;
        }

        let cx = view[[0, i]];
        let cy = view[[1, i]];
        let w = view[[2, i]];
        let h = view[[3, i]];

        out.push(BoxPrediction {
            xyxy: [
                ((cx - w / 2.0) * sx).clamp(0.0, max_x),
                ((cy - h / 2.0) * sy).clamp(0.0, max_y),
                ((cx + w / 2.0) * sx).clamp(0.0, max_x),
                ((cy + h / 2.0) * sy).clamp(0.0, max_y),
            ],
            confidence: score,
            class_id,
        });
    }

    out
}

/// Greedy per-class NMS; survivors come out by descending confidence.
pub fn non_max_suppression(mut boxes: Vec<BoxPrediction>, iou_threshold: f32) -> Vec<BoxPrediction> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut suppressed = vec![false; boxes.len()];
    let mut kept = Vec::new();

    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        kept.push(boxes[i]);
        for j in (i + 1)..boxes.len() {
            if !suppressed[j]
                && boxes[j].class_id == boxes[i].class_id
                && boxes[i].iou(&boxes[j]) > iou_threshold
            {
                suppressed[j] = true;
            }
        }
    }

    kept
}

/// Parses the `names` metadata of an Ultralytics export: `{0: 'person', 1: 'bicycle'}`.
pub fn parse_names(raw: &str) -> Option<Vec<String>> {
    static NAME_ENTRY: OnceLock<Regex> = OnceLock::new();
    let entry = NAME_ENTRY.get_or_init(|| {
        Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("valid class-name pattern")
    });

    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let entries: Vec<(usize, String)> = entry
        .captures_iter(body)
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str().parse().ok()?;
            let name = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
            Some((id, name))
        })
        .collect();

    let len = entries.iter().map(|(id, _)| id + 1).max()?;
    let mut names: Vec<String> = (0..len).map(|i| format!("class{}", i)).collect();
    for (id, name) in entries {
        names[id] = name;
    }
    Some(names)
}

/// `imgsz` metadata is `[640, 640]`; the network input is square.
pub fn parse_imgsz(raw: &str) -> Option<u32> {
    raw.trim()
        .trim_start_matches('[')
        .split(|c| c == ',' || c == ']')
        .next()?
        .trim()
        .parse()
        .ok()
        .filter(|&n| n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn pred(xyxy: [f32; 4], confidence: f32, class_id: usize) -> BoxPrediction {
        BoxPrediction { xyxy, confidence, class_id }
    }

    #[test]
    fn parses_ultralytics_names() {
        let names = parse_names("{0: 'person', 1: 'traffic light', 2: \"it's\"}").unwrap();
        assert_eq!(names, vec!["person", "traffic light", "it's"]);
    }

    #[test]
    fn names_may_contain_commas_and_colons() {
        let names = parse_names("{0: 'a, b', 1: 'x:y'}").unwrap();
        assert_eq!(names, vec!["a, b", "x:y"]);
    }

    #[test]
    fn fills_gaps_in_names() {
        let names = parse_names("{0: 'a', 2: 'c'}").unwrap();
        assert_eq!(names, vec!["a", "class1", "c"]);
    }

    #[test]
    fn rejects_malformed_names() {
        assert!(parse_names("person, car").is_none());
        assert!(parse_names("{}").is_none());
        assert!(parse_names("{0: person}").is_none());
    }

    #[test]
    fn parses_imgsz() {
        assert_eq!(parse_imgsz("[640, 640]"), Some(640));
        assert_eq!(parse_imgsz("[320,320]"), Some(320));
        assert_eq!(parse_imgsz("nope"), None);
    }

    #[test]
    fn nms_suppresses_same_class_overlap() {
        let boxes = vec![
            pred([0.0, 0.0, 10.0, 10.0], 0.8, 0),
            pred([1.0, 0.0, 11.0, 10.0], 0.9, 0),
            pred([50.0, 50.0, 60.0, 60.0], 0.7, 0),
        ];
        let kept = non_max_suppression(boxes, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn nms_keeps_overlap_of_different_classes() {
        let boxes = vec![
            pred([0.0, 0.0, 10.0, 10.0], 0.8, 0),
            pred([0.0, 0.0, 10.0, 10.0], 0.9, 1),
        ];
        assert_eq!(non_max_suppression(boxes, 0.5).len(), 2);
    }

    #[test]
    fn decodes_and_scales_candidates() {
        // 2 classes, 3 candidates: rows are cx, cy, w, h, score0, score1
        let head = Array2::from_shape_vec(
            (6, 3),
            vec![
                100.0, 320.0, 630.0, // cx
                100.0, 320.0, 630.0, // cy
                20.0, 40.0, 40.0, // w
                20.0, 40.0, 40.0, // h
                0.9, 0.1, 0.6, // class 0
                0.2, 0.3, 0.1, // class 1
            ],
        )
        .unwrap();

        let out = decode_candidates(head.view(), (0.5, 0.5), (320, 320), 0.5);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].class_id, 0);
        assert_eq!(out[0].xyxy, [45.0, 45.0, 55.0, 55.0]);
        // clipped to the original image bounds
        assert_eq!(out[1].xyxy, [305.0, 305.0, 320.0, 320.0]);
    }

    #[test]
    fn zero_threshold_keeps_every_candidate() {
        let head = Array2::from_shape_vec((5, 2), vec![1.0, 2.0, 1.0, 2.0, 1.0, 1.0, 1.0, 1.0, 0.0, 0.01]).unwrap();
        assert_eq!(decode_candidates(head.view(), (1.0, 1.0), (10, 10), 0.0).len(), 2);
    }
}
