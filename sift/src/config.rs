use std::path::PathBuf;

/// Plain configuration the server side needs: where to bind and where to
/// find its private key. Loading this from a file, environment, or CLI
/// flags is left to the embedder; this crate only fixes the shape.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub private_key_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_address: default_bind_address(),
            private_key_path: PathBuf::from("server_key.pem"),
        }
    }
}

/// Plain configuration the client side needs: where to connect and where
/// to find the server's public key.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_address: String,
    pub server_public_key_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            server_address: default_bind_address(),
            server_public_key_path: PathBuf::from("server_key_public.pem"),
        }
    }
}

pub fn default_bind_address() -> String {
    "localhost:5150".to_string()
}
