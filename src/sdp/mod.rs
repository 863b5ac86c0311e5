//! Session description handling
//!
//! This module provides:
//! - SDP parsing and serialization
//! - Codec, RTCP feedback and header extension descriptions
//! - Stream/track grouping from `msid` and `ssrc` attributes
//! - Answer construction against the server capability set

pub mod answer;
pub mod capability;
pub mod codec;
pub mod description;
pub mod stream;

pub use answer::{DtlsParameters, DtlsSetup, IceCandidate, IceParameters};
pub use capability::{Capabilities, Capability};
pub use codec::{Codec, Extension, RtcpFeedback};
pub use description::{
    Attribute, Attributes, Direction, MediaDescription, MediaKind, Origin, SessionDescription,
};
pub use stream::{StreamInfo, TrackInfo};

#[cfg(test)]
pub(crate) mod test_offers {
    /// Browser publish offer: one stream ("stream-a") with audio and video
    pub const PUBLISH: &str = "v=0\r\n\
o=- 4215775240449105457 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
a=msid-semantic: WMS stream-a\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:pubU\r\n\
a=ice-pwd:pubpasswordpubpasswordpw\r\n\
a=fingerprint:sha-256 12:34:56:78:9A:BC:DE:F0:12:34:56:78:9A:BC:DE:F0:12:34:56:78:9A:BC:DE:F0:12:34:56:78:9A:BC:DE:F0\r\n\
a=setup:actpass\r\n\
a=mid:0\r\n\
a=extmap:1 urn:ietf:params:rtp-hdrext:ssrc-audio-level\r\n\
a=sendonly\r\n\
a=msid:stream-a audio-track\r\n\
a=rtcp-mux\r\n\
a=rtpmap:111 opus/48000/2\r\n\
a=fmtp:111 minptime=10;useinbandfec=1\r\n\
a=ssrc:1111 cname:pubcname\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97 102 103\r\n\
c=IN IP4 0.0.0.0\r\n\
a=ice-ufrag:pubU\r\n\
a=ice-pwd:pubpasswordpubpasswordpw\r\n\
a=fingerprint:sha-256 12:34:56:78:9A:BC:DE:F0:12:34:56:78:9A:BC:DE:F0:12:34:56:78:9A:BC:DE:F0:12:34:56:78:9A:BC:DE:F0\r\n\
a=setup:actpass\r\n\
a=mid:1\r\n\
a=extmap:3 http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time\r\n\
a=extmap:4 urn:3gpp:video-orientation\r\n\
a=extmap:9 urn:example:unknown\r\n\
a=sendonly\r\n\
a=msid:stream-a video-track\r\n\
a=rtcp-mux\r\n\
a=rtcp-rsize\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 goog-remb\r\n\
a=rtcp-fb:96 transport-cc\r\n\
a=rtcp-fb:96 ccm fir\r\n\
a=rtcp-fb:96 nack\r\n\
a=rtcp-fb:96 nack pli\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n\
a=rtpmap:102 H264/90000\r\n\
a=rtcp-fb:102 nack pli\r\n\
a=fmtp:102 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e01f\r\n\
a=rtpmap:103 rtx/90000\r\n\
a=fmtp:103 apt=102\r\n\
a=ssrc-group:FID 2222 2223\r\n\
a=ssrc:2222 cname:pubcname\r\n\
a=ssrc:2222 msid:stream-a video-track\r\n\
a=ssrc:2223 cname:pubcname\r\n\
a=ssrc:2223 msid:stream-a video-track\r\n";

    /// Browser watch offer: receive-only audio and video, no streams
    pub const WATCH: &str = "v=0\r\n\
o=- 7755221133 2 IN IP4 127.0.0.1\r\n\
s=-\r\n\
t=0 0\r\n\
a=group:BUNDLE 0 1\r\n\
a=ice-ufrag:watU\r\n\
a=ice-pwd:watchpasswordwatchpasswd\r\n\
a=fingerprint:sha-256 AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99:AA:BB:CC:DD:EE:FF:00:11:22:33:44:55:66:77:88:99\r\n\
m=audio 9 UDP/TLS/RTP/SAVPF 111\r\n\
c=IN IP4 0.0.0.0\r\n\
a=setup:actpass\r\n\
a=mid:0\r\n\
a=recvonly\r\n\
a=rtcp-mux\r\n\
a=rtpmap:111 opus/48000/2\r\n\
m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\n\
c=IN IP4 0.0.0.0\r\n\
a=setup:actpass\r\n\
a=mid:1\r\n\
a=recvonly\r\n\
a=rtcp-mux\r\n\
a=rtpmap:96 VP8/90000\r\n\
a=rtcp-fb:96 nack pli\r\n\
a=rtpmap:97 rtx/90000\r\n\
a=fmtp:97 apt=96\r\n";
}
