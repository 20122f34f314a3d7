//! Textual endpoint format.
//!
//! ```text
//! tcp -h <host> -p <port> [--sourceAddress <addr>] -t <timeout|infinite> [-z]
//! ssl -h <host> -p <port> [--sourceAddress <addr>] -t <timeout|infinite> [-z]
//! ws  -h <host> -p <port> [--sourceAddress <addr>] -t <timeout|infinite> [-z] [-r <resource>]
//! wss -h <host> -p <port> [--sourceAddress <addr>] -t <timeout|infinite> [-z] [-r <resource>]
//! udp -h <host> -p <port> [--sourceAddress <addr>] [--interface <if>] [--ttl <n>] [-z]
//! opaque -t <type> [-e <major.minor>] -v <hex bytes>
//! ```
//!
//! Values containing whitespace or quotes are written in double quotes.
//! Every chain produced by [`parse`] renders back to a string that parses to
//! an equal chain.

use std::collections::BTreeMap;
use std::fmt;

use crate::encoding::{EncodingVersion, ENCODING_1_0};
use crate::endpoint::info::{EndpointInfo, EndpointKind, IpEndpointInfo};
use crate::error::{Error, Result};
use crate::strings::{quote_if_needed, split_quoted};

impl fmt::Display for EndpointInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&EndpointKind> = self.layers().map(|layer| layer.kind()).collect();
        let protocol = match kinds.as_slice() {
            [EndpointKind::Ws { .. }, EndpointKind::Ssl, ..] => "wss",
            [EndpointKind::Ws { .. }, ..] => "ws",
            [EndpointKind::Ssl, ..] => "ssl",
            [EndpointKind::Udp { .. }, ..] => "udp",
            [EndpointKind::Opaque { .. }, ..] => "opaque",
            #[cfg(any(target_os = "ios", target_os = "tvos", target_os = "watchos"))]
            [EndpointKind::Iap { .. }, ..] => "iap",
            _ => "tcp",
        };
        f.write_str(protocol)?;

        if let EndpointKind::Opaque {
            type_code,
            raw_encoding,
            raw_bytes,
        } = self.kind()
        {
            return write!(
                f,
                " -t {} -e {} -v {}",
                type_code,
                raw_encoding,
                quote_if_needed(&hex::encode(raw_bytes))
            );
        }

        #[cfg(any(target_os = "ios", target_os = "tvos", target_os = "watchos"))]
        if let EndpointKind::Iap {
            manufacturer,
            model_number,
            name,
            protocol,
        } = self.kind()
        {
            write!(
                f,
                " -m {} -o {} -n {} -p {}",
                quote_if_needed(manufacturer),
                quote_if_needed(model_number),
                quote_if_needed(name),
                quote_if_needed(protocol)
            )?;
            write_timeout(f, self.timeout())?;
            if self.compress() {
                f.write_str(" -z")?;
            }
            return Ok(());
        }

        if let Some(ip) = self.ip() {
            if !ip.host.is_empty() {
                write!(f, " -h {}", quote_if_needed(&ip.host))?;
            }
            write!(f, " -p {}", ip.port)?;
            if !ip.source_address.is_empty() {
                write!(f, " --sourceAddress {}", quote_if_needed(&ip.source_address))?;
            }
        }

        match self.innermost().kind() {
            EndpointKind::Udp {
                mcast_interface,
                mcast_ttl,
                ..
            } => {
                if !mcast_interface.is_empty() {
                    write!(f, " --interface {}", quote_if_needed(mcast_interface))?;
                }
                if *mcast_ttl != -1 {
                    write!(f, " --ttl {}", mcast_ttl)?;
                }
            }
            _ => write_timeout(f, self.timeout())?,
        }

        if self.compress() {
            f.write_str(" -z")?;
        }

        if let EndpointKind::Ws { resource } = self.kind() {
            if !resource.is_empty() {
                write!(f, " -r {}", quote_if_needed(resource))?;
            }
        }
        Ok(())
    }
}

fn write_timeout(f: &mut fmt::Formatter<'_>, timeout: i32) -> fmt::Result {
    if timeout == -1 {
        f.write_str(" -t infinite")
    } else {
        write!(f, " -t {}", timeout)
    }
}

/// Parse an endpoint string into an [`EndpointInfo`] chain.
pub fn parse(input: &str) -> Result<EndpointInfo> {
    let tokens = split_quoted(input, char::is_whitespace)
        .map_err(|reason| Error::endpoint_parse(input, reason))?;
    let (protocol, rest) = tokens
        .split_first()
        .ok_or_else(|| Error::endpoint_parse(input, "empty endpoint"))?;
    let protocol = protocol.to_ascii_lowercase();
    let mut options = Options::collect(input, rest)?;

    let info = match protocol.as_str() {
        "tcp" | "ssl" | "ws" | "wss" => {
            let allowed: &[&str] = if protocol.starts_with("ws") {
                &["-h", "-p", "-t", "-z", "--sourceAddress", "-r"]
            } else {
                &["-h", "-p", "-t", "-z", "--sourceAddress"]
            };
            options.check_allowed(allowed)?;
            let ip = options.ip()?;
            let timeout = options.timeout()?;
            let compress = options.flag("-z");
            let tcp = EndpointInfo::tcp(ip, timeout, compress);
            match protocol.as_str() {
                "tcp" => tcp,
                "ssl" => EndpointInfo::layered(EndpointKind::Ssl, timeout, compress, tcp),
                _ => {
                    let transport = if protocol == "wss" {
                        EndpointInfo::layered(EndpointKind::Ssl, timeout, compress, tcp)
                    } else {
                        tcp
                    };
                    let ws = EndpointKind::Ws {
                        resource: options.take("-r").unwrap_or_default(),
                    };
                    EndpointInfo::layered(ws, timeout, compress, transport)
                }
            }
        }
        "udp" => {
            options.check_allowed(&["-h", "-p", "-z", "--sourceAddress", "--interface", "--ttl"])?;
            let ip = options.ip()?;
            let mcast_interface = options.take("--interface").unwrap_or_default();
            let mcast_ttl = match options.take("--ttl") {
                Some(ttl) => options.integer("--ttl", &ttl)?,
                None => -1,
            };
            EndpointInfo::udp(ip, mcast_interface, mcast_ttl, options.flag("-z"))
        }
        "opaque" => {
            options.check_allowed(&["-t", "-e", "-v"])?;
            let type_code = options
                .take("-t")
                .ok_or_else(|| options.error("no -t option in opaque endpoint"))?;
            let type_code: i16 = type_code
                .parse()
                .ok()
                .filter(|t: &i16| *t >= 0)
                .ok_or_else(|| {
                    options.error(format!("invalid type `{}` in opaque endpoint", type_code))
                })?;
            let raw_encoding = match options.take("-e") {
                Some(e) => e.parse::<EncodingVersion>().map_err(|reason| options.error(reason))?,
                None => ENCODING_1_0,
            };
            let value = options
                .take("-v")
                .ok_or_else(|| options.error("no -v option in opaque endpoint"))?;
            let raw_bytes = hex::decode(&value)
                .map_err(|err| options.error(format!("invalid -v value: {}", err)))?;
            EndpointInfo::new(
                EndpointKind::Opaque {
                    type_code,
                    raw_encoding,
                    raw_bytes,
                },
                -1,
                false,
            )
        }
        #[cfg(any(target_os = "ios", target_os = "tvos", target_os = "watchos"))]
        "iap" => {
            options.check_allowed(&["-m", "-o", "-n", "-p", "-t", "-z"])?;
            let timeout = options.timeout()?;
            EndpointInfo::new(
                EndpointKind::Iap {
                    manufacturer: options.take("-m").unwrap_or_default(),
                    model_number: options.take("-o").unwrap_or_default(),
                    name: options.take("-n").unwrap_or_default(),
                    protocol: options.take("-p").unwrap_or_default(),
                },
                timeout,
                options.flag("-z"),
            )
        }
        other => return Err(Error::endpoint_parse(input, format!("unknown protocol `{}`", other))),
    };
    Ok(info)
}

/// Options of one endpoint string, keyed by option name.
struct Options<'a> {
    input: &'a str,
    values: BTreeMap<String, Option<String>>,
}

impl<'a> Options<'a> {
    fn collect(input: &'a str, tokens: &[String]) -> Result<Self> {
        let mut values = BTreeMap::new();
        let mut iter = tokens.iter().peekable();
        while let Some(option) = iter.next() {
            if !option.starts_with('-') || option.len() < 2 {
                return Err(Error::endpoint_parse(
                    input,
                    format!("expected an option but found `{}`", option),
                ));
            }
            let value = if option == "-z" {
                None
            } else {
                match iter.peek() {
                    Some(next) if !looks_like_option(next) => iter.next().cloned(),
                    _ => {
                        return Err(Error::endpoint_parse(
                            input,
                            format!("no argument provided for {} option", option),
                        ))
                    }
                }
            };
            if values.insert(option.clone(), value).is_some() {
                return Err(Error::endpoint_parse(
                    input,
                    format!("{} option specified more than once", option),
                ));
            }
        }
        Ok(Self { input, values })
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::endpoint_parse(self.input, reason)
    }

    fn check_allowed(&self, allowed: &[&str]) -> Result<()> {
        match self.values.keys().find(|name| !allowed.contains(&name.as_str())) {
            Some(name) => Err(self.error(format!("unknown option `{}`", name))),
            None => Ok(()),
        }
    }

    fn take(&mut self, name: &str) -> Option<String> {
        self.values.remove(name).flatten()
    }

    fn flag(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    fn integer(&self, name: &str, value: &str) -> Result<i32> {
        value
            .parse()
            .map_err(|_| self.error(format!("invalid {} value `{}`", name, value)))
    }

    fn ip(&mut self) -> Result<IpEndpointInfo> {
        let host = self.take("-h").unwrap_or_default();
        let port = match self.take("-p") {
            Some(port) => {
                let port = self.integer("-p", &port)?;
                if !(0..=65535).contains(&port) {
                    return Err(self.error(format!("port {} out of range", port)));
                }
                port
            }
            None => 0,
        };
        let source_address = self.take("--sourceAddress").unwrap_or_default();
        Ok(IpEndpointInfo {
            host,
            port,
            source_address,
        })
    }

    fn timeout(&mut self) -> Result<i32> {
        match self.take("-t") {
            None => Ok(-1),
            Some(t) if t == "infinite" => Ok(-1),
            Some(t) => self.integer("-t", &t),
        }
    }
}

/// An option name starts with `-` and is not a (negative) number.
fn looks_like_option(token: &str) -> bool {
    token.starts_with('-') && token.parse::<i64>().is_err()
}
