//! Wire framing for the legacy game-server protocol.
//!
//! The upstream server speaks a stream protocol where messages are
//! separated by a single reserved byte (NUL). This crate splits that
//! continuous byte stream into discrete frames and terminates outbound
//! frames, nothing more — the bytes inside a frame are opaque here.
//!
//! ```text
//! TLS byte stream:  %xt%o%m#...\0%xt%o%gl#...\0<partial...
//!                   └── frame 1 ──┘└── frame 2 ──┘└─ buffered ─┘
//! ```
//!
//! [`FrameCodec`] implements `tokio_util`'s [`Decoder`] and [`Encoder`]
//! so it can be dropped into `FramedRead`/`FramedWrite` over any async
//! byte stream.
//!
//! [`Decoder`]: tokio_util::codec::Decoder
//! [`Encoder`]: tokio_util::codec::Encoder

mod codec;

pub use codec::{FrameCodec, DELIMITER};
