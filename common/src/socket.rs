use socket2::{Domain, Socket, Type};
use std::net::{AddrParseError, SocketAddr};

pub fn listen_reuse_socket(addr: &SocketAddr) -> Result<Socket, std::io::Error> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_nonblocking(true)?;
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    socket.bind(&(*addr).into())?;
    socket.listen(128)?;
    Ok(socket)
}

/// Accepts ":5000" and bare "5000" (the deployment convention for the PORT
/// environment variable) in addition to a full "host:port" pair.
pub fn parse_address(mut addr: String) -> Result<SocketAddr, AddrParseError> {
    if !addr.is_empty() && addr.chars().all(|c| c.is_ascii_digit()) {
        addr.insert(0, ':');
    }

    if addr.starts_with(':') {
        addr.insert_str(0, "0.0.0.0");
    }

    addr.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_address() {
        let addr = parse_address("127.0.0.1:5000".to_string()).unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:5000");
    }

    #[test]
    fn parse_port_only_with_colon() {
        let addr = parse_address(":5000".to_string()).unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn parse_bare_port() {
        let addr = parse_address("5000".to_string()).unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn parse_garbage_fails() {
        assert!(parse_address("not-an-address".to_string()).is_err());
    }
}
