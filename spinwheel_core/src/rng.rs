use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

// Provably-fair draws: HMAC-SHA256(server_seed, "client_seed:nonce") -> first 4 bytes -> [0,1)

pub type HmacSha256 = Hmac<Sha256>;

/// Source of independent uniform draws in `[0, 1)`, one per spin.
pub trait DrawSource {
    fn next_draw(&mut self) -> f64;
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Map the leading 4 bytes of a digest onto `[0, 1)`.
pub fn draw_from_bytes(bytes: &[u8; 32]) -> f64 {
    let v = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    (v as f64) / (u32::MAX as f64 + 1.0)
}

#[derive(Debug, Clone)]
pub struct ProvablyFairRng {
    pub server_seed: String, // secret
    pub client_seed: String,
    pub nonce: u64,
}

impl ProvablyFairRng {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
        }
    }

    /// Commitment published before play; lets players check the revealed seed later.
    pub fn server_seed_hash_hex(&self) -> String {
        derive_hash_hex(self.server_seed.as_bytes())
    }

    pub fn hmac_bytes(&self, nonce: u64) -> [u8; 32] {
        let mut mac = HmacSha256::new_from_slice(self.server_seed.as_bytes()).expect("HMAC key");
        let msg = format!("{}:{}", self.client_seed, nonce);
        mac.update(msg.as_bytes());
        let res = mac.finalize().into_bytes();
        let mut out = [0u8; 32];
        out.copy_from_slice(&res);
        out
    }

    /// Draw for a given nonce without advancing.
    pub fn draw_at(&self, nonce: u64) -> f64 {
        draw_from_bytes(&self.hmac_bytes(nonce))
    }
}

impl DrawSource for ProvablyFairRng {
    fn next_draw(&mut self) -> f64 {
        let draw = self.draw_at(self.nonce);
        self.nonce += 1;
        draw
    }
}

/// Draws from any `rand` generator.
#[derive(Debug, Clone)]
pub struct ThreadDraws<R: Rng>(pub R);

impl ThreadDraws<rand::rngs::ThreadRng> {
    pub fn os_seeded() -> Self {
        Self(rand::thread_rng())
    }
}

impl<R: Rng> DrawSource for ThreadDraws<R> {
    fn next_draw(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}
