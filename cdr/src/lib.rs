//! cdr_rs - Rust implementation of 3GPP charging data record encoding
//!
//! This library encodes and decodes charging data records (CDRs) with
//! ASN.1 BER and aligned PER, driven by run-time schemas, and reads and
//! writes the TS 32.297 CDR file container.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `cdr-core`: Error handling and the BIT STRING type
//! - `cdr-asn1`: Schema model and the BER/PER engine
//! - `cdr-file`: CDR file header, record headers, file container
//! - `cdr-types`: TS 32.298 record schemas and conversion helpers
//!
//! # Implementation Status
//!
//! ## ✅ 已完成
//! - Schema / Value 模型（字段选项字符串解析）
//! - BER 编码/解码（不定长构造类型、显式/隐式标签、CHOICE、OPEN TYPE）
//! - 对齐 PER 编码/解码（约束整数、长度分片、扩展位）
//! - CDR 文件头、CDR 头、文件读写
//! - CHF 记录 schema 摘录、时间戳与用量转换
//!
//! ## 📋 待实现
//! - 非对齐 PER
//! - XER
//!
//! # Usage
//!
//! ```no_run
//! use cdr::asn1::{encode, decode, Schema, Value};
//!
//! let schema = Schema::integer().value_range(0, 255).explicit();
//! let bytes = encode(&schema, &Value::Int(7))?;
//! assert_eq!(decode(&schema, &bytes)?, Value::Int(7));
//! # Ok::<(), cdr::CdrError>(())
//! ```

// Re-export core types
pub use cdr_core::{BitString, CdrError, CdrResult};

// Re-export the encoding engine
pub mod asn1 {
    pub use cdr_asn1::*;
}

// Re-export the file container
pub mod file {
    pub use cdr_file::*;
}

// Re-export record schemas
pub mod types {
    pub use cdr_types::*;
}
