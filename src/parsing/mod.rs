//! xz container structure parsing modules.

pub mod block_header;
pub mod index;
pub mod stream_footer;
pub mod stream_header;
pub mod vli;

pub use block_header::{BlockHeader, BlockHeaderParser, FilterFlags};
pub use index::{IndexParser, IndexRecord};
pub use stream_footer::{StreamFooter, StreamFooterParser};
pub use stream_header::{StreamFlags, StreamHeaderParser};
