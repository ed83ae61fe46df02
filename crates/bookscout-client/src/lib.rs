pub mod backend;

pub use backend::ReqwestBackend;
