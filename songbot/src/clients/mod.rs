mod decode;
/// Data entities for songs, tracks and playlists
pub mod entities;
/// Error types and result aliases
pub mod errors;
/// Genius search API and lyrics page client
pub mod genius;
/// Spotify Web API client
pub mod spotify;
/// HTTP seam shared by the provider clients
pub mod transport;

pub use genius::GeniusClient;
pub use spotify::SpotifyClient;
pub use transport::{ReqwestTransport, Transport};
