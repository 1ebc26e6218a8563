pub mod http;
pub mod onnx;
