/* 📖 # What is the Platform Abstraction Layer?

The PAL wraps filesystem access, directory watching and the HTTP server behind
one trait. RealPal talks to the operating system, MockPal keeps everything in
memory so engine tests run without temp directories or sockets.
*/

mod file_path;
pub mod http;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{
    DirEntry, FileChangeCallback, FileChangeEvent, Pal, PalHandle, ReadSeek, WatchHandle,
};
