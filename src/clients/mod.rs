//! 外部服务客户端：高德地点查询、岗位接口、OCR 和政策咨询。
//!
//! # Collaborator Clients
//!
//! Each client owns an [`HttpTransport`](crate::transport::HttpTransport) with
//! its own timeout and a [`RetryPolicy`](crate::resilience::RetryPolicy) taken
//! from its config section.
//!
//! | Client | Service |
//! |--------|---------|
//! | [`AmapClient`] | Place name to coordinates |
//! | [`JobApiClient`] | Job listings by area or radius |
//! | [`OcrClient`] | Text of an uploaded image or PDF |
//! | [`PolicyClient`] | Policy consultation, ticket cached for an hour |

pub mod amap;
pub mod jobs;
pub mod ocr;
pub mod policy;

pub use amap::{AmapClient, GeoPoint};
pub use jobs::{JobApiClient, JobQuery, JobRow, JobSearchResult};
pub use ocr::{ImageTextExtractor, OcrClient};
pub use policy::{PolicyAnswer, PolicyClient, PolicyQuery, PolicyTicket};
