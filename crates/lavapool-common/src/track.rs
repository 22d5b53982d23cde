use serde::Deserialize;

/// Metadata for a single playable track, as reported by a node.
///
/// Field names follow the node's camelCase JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub identifier: String,
    #[serde(default)]
    pub is_seekable: bool,
    #[serde(default)]
    pub author: String,
    /// Track length in milliseconds.
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub is_stream: bool,
    /// Playback position in milliseconds.
    #[serde(default)]
    pub position: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub uri: Option<String>,
}

/// A playable track: the node's opaque base64 payload plus its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// The base64 identifier the node uses to refer to this track.
    pub id: String,
    pub info: TrackInfo,
}

impl Track {
    pub fn new(id: impl Into<String>, info: TrackInfo) -> Self {
        Self {
            id: id.into(),
            info,
        }
    }

    /// True when the track is a live stream rather than seekable media.
    pub fn is_stream(&self) -> bool {
        self.info.is_stream
    }
}

/// Playlist metadata attached to a loadtracks response.
///
/// The node sends `{}` when the query did not resolve to a playlist, so an
/// all-`None` value is treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub selected_track: Option<i64>,
}

impl PlaylistInfo {
    /// True when the node sent no playlist metadata (empty object).
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.selected_track.is_none()
    }
}

/// A playlist aggregate built from a loadtracks response that carried
/// non-empty playlist metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlaylist {
    pub name: String,
    pub selected_track: Option<i64>,
    pub tracks: Vec<Track>,
}

impl TrackPlaylist {
    /// Builds the aggregate from a decoded loadtracks response.
    pub fn from_response(response: LoadTracksResponse) -> Self {
        let info = response.playlist_info.unwrap_or_default();
        let tracks = response
            .tracks
            .into_iter()
            .map(|raw| Track::new(raw.track, raw.info))
            .collect();

        Self {
            name: info.name.unwrap_or_default(),
            selected_track: info.selected_track,
            tracks,
        }
    }
}

/// One entry of the loadtracks `tracks` array.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawTrack {
    /// Base64 track payload.
    pub track: String,
    pub info: TrackInfo,
}

/// The raw body of a `GET /loadtracks` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTracksResponse {
    #[serde(default)]
    pub tracks: Vec<RawTrack>,
    #[serde(default)]
    pub playlist_info: Option<PlaylistInfo>,
}

impl LoadTracksResponse {
    /// True when the response carries non-empty playlist metadata.
    pub fn is_playlist(&self) -> bool {
        self.playlist_info
            .as_ref()
            .map(|info| !info.is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track_json(identifier: &str) -> String {
        format!(
            r#"{{"track": "QAAA{identifier}", "info": {{
                "identifier": "{identifier}",
                "isSeekable": true,
                "author": "tester",
                "length": 60000,
                "isStream": false,
                "position": 0,
                "title": "test track",
                "uri": "https://example.invalid/{identifier}"
            }}}}"#
        )
    }

    #[test]
    fn test_decode_plain_tracks_response() {
        let body = format!(
            r#"{{"tracks": [{}, {}], "playlistInfo": {{}}}}"#,
            track_json("abc"),
            track_json("def")
        );
        let decoded: LoadTracksResponse = serde_json::from_str(&body).unwrap();

        assert_eq!(decoded.tracks.len(), 2);
        assert!(!decoded.is_playlist());
        assert_eq!(decoded.tracks[0].info.identifier, "abc");
        assert_eq!(decoded.tracks[0].info.length, 60000);
    }

    #[test]
    fn test_decode_playlist_response() {
        let body = format!(
            r#"{{"tracks": [{}], "playlistInfo": {{"name": "mix", "selectedTrack": 0}}}}"#,
            track_json("abc")
        );
        let decoded: LoadTracksResponse = serde_json::from_str(&body).unwrap();
        assert!(decoded.is_playlist());

        let playlist = TrackPlaylist::from_response(decoded);
        assert_eq!(playlist.name, "mix");
        assert_eq!(playlist.selected_track, Some(0));
        assert_eq!(playlist.tracks.len(), 1);
        assert_eq!(playlist.tracks[0].id, "QAAAabc");
    }

    #[test]
    fn test_null_playlist_info_is_not_a_playlist() {
        let body = r#"{"tracks": [], "playlistInfo": null}"#;
        let decoded: LoadTracksResponse = serde_json::from_str(body).unwrap();
        assert!(!decoded.is_playlist());
        assert!(decoded.tracks.is_empty());
    }

    #[test]
    fn test_empty_playlist_info_object_is_not_a_playlist() {
        let body = r#"{"tracks": [], "playlistInfo": {}}"#;
        let decoded: LoadTracksResponse = serde_json::from_str(body).unwrap();
        assert!(!decoded.is_playlist());
    }

    #[test]
    fn test_missing_fields_default() {
        let decoded: LoadTracksResponse = serde_json::from_str("{}").unwrap();
        assert!(decoded.tracks.is_empty());
        assert!(decoded.playlist_info.is_none());
    }

    #[test]
    fn test_track_info_tolerates_sparse_metadata() {
        let info: TrackInfo = serde_json::from_str(r#"{"identifier": "xyz"}"#).unwrap();
        assert_eq!(info.identifier, "xyz");
        assert_eq!(info.length, 0);
        assert!(info.uri.is_none());
    }
}
