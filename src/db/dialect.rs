//! DSN classification and normalization.
//!
//! A bare DSN string is mapped to a dialect by a fixed precedence list:
//! `postgres*` prefix, then `.db` anywhere, then `mysql*` prefix or no scheme.
//! The same module turns the classified string into something the driver accepts.

use crate::error::{DbError, DbResult};
use crate::models::Dialect;
use sqlx::mysql::MySqlConnectOptions;

const SSL_MODE_PARAM: &str = "sslmode=";
const DEFAULT_MYSQL_TCP_ADDR: &str = "127.0.0.1:3306";
const DEFAULT_MYSQL_SOCKET: &str = "/tmp/mysql.sock";

/// Classify a DSN by dialect.
///
/// The first matching rule wins, so `postgres://host/app.db` is PostgreSQL and
/// `mysql://host/app.db` is SQLite.
pub fn classify(dsn: &str) -> DbResult<Dialect> {
    if dsn.starts_with("postgres") {
        Ok(Dialect::Postgres)
    } else if dsn.contains(".db") {
        Ok(Dialect::Sqlite)
    } else if dsn.starts_with("mysql") || !dsn.contains("://") {
        Ok(Dialect::MySql)
    } else {
        Err(DbError::unsupported_dialect(dsn))
    }
}

/// Trim whitespace and force `sslmode=disable` unless the DSN already sets a mode.
pub fn normalize_postgres_dsn(dsn: &str) -> String {
    let dsn = dsn.trim();
    if dsn.contains(SSL_MODE_PARAM) {
        return dsn.to_string();
    }
    let separator = if dsn.contains('?') { '&' } else { '?' };
    format!("{dsn}{separator}{SSL_MODE_PARAM}disable")
}

/// Database name of a PostgreSQL URL: the last path segment, query excluded.
pub fn postgres_database_name(dsn: &str) -> String {
    if let Ok(parsed) = url::Url::parse(dsn) {
        if let Some(name) = parsed.path_segments().and_then(|mut s| s.next_back()) {
            return name.to_string();
        }
    }
    let before_query = dsn.split('?').next().unwrap_or_default();
    before_query
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Remove a leading `scheme://` if present.
pub fn strip_scheme(dsn: &str) -> &str {
    match dsn.find("://") {
        Some(pos) => &dsn[pos + 3..],
        None => dsn,
    }
}

/// Where a MySQL server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MySqlAddress {
    Tcp { host: String, port: u16 },
    Socket(String),
}

/// A parsed Go-driver style MySQL DSN:
/// `[user[:password]@][net[(addr)]]/dbname[?param=value&...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MySqlDsn {
    pub user: String,
    pub password: Option<String>,
    pub address: MySqlAddress,
    pub database: String,
    pub params: Vec<(String, String)>,
}

impl MySqlDsn {
    /// Parse a scheme-less MySQL DSN.
    pub fn parse(dsn: &str) -> DbResult<Self> {
        let dsn = strip_scheme(dsn.trim());
        let slash = dsn.rfind('/').ok_or_else(|| {
            DbError::invalid_dsn(Dialect::MySql, "missing the slash separating the database name")
        })?;

        let (database, params) = match dsn[slash + 1..].split_once('?') {
            Some((db, query)) => (db.to_string(), parse_params(query)),
            None => (dsn[slash + 1..].to_string(), Vec::new()),
        };

        let prefix = &dsn[..slash];
        let (credentials, location) = match prefix.rfind('@') {
            Some(at) => (Some(&prefix[..at]), &prefix[at + 1..]),
            None => (None, prefix),
        };

        let (user, password) = match credentials {
            Some(creds) => match creds.split_once(':') {
                Some((user, password)) => (user.to_string(), Some(password.to_string())),
                None => (creds.to_string(), None),
            },
            None => (String::new(), None),
        };

        Ok(Self {
            user,
            password,
            address: parse_address(location)?,
            database,
            params,
        })
    }

    /// Look up a query parameter by key.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Build driver options from the parsed parts.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new();
        options = match &self.address {
            MySqlAddress::Tcp { host, port } => options.host(host).port(*port),
            MySqlAddress::Socket(path) => options.socket(path),
        };
        if !self.user.is_empty() {
            options = options.username(&self.user);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        if !self.database.is_empty() {
            options = options.database(&self.database);
        }
        let charset = self
            .param("charset")
            .and_then(|c| c.split(',').next())
            .unwrap_or("utf8mb4");
        options.charset(charset)
    }
}

fn parse_params(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn parse_address(location: &str) -> DbResult<MySqlAddress> {
    if location.is_empty() {
        return tcp_address(DEFAULT_MYSQL_TCP_ADDR);
    }

    let (net, addr) = match location.find('(') {
        Some(open) => {
            if !location.ends_with(')') {
                return Err(DbError::invalid_dsn(
                    Dialect::MySql,
                    "network address not terminated (missing closing brace)",
                ));
            }
            (&location[..open], &location[open + 1..location.len() - 1])
        }
        None => match location {
            "tcp" | "tcp4" | "tcp6" | "unix" => (location, ""),
            // Lenient form: a bare host[:port] without a protocol.
            _ => ("tcp", location),
        },
    };

    match net {
        "unix" => Ok(MySqlAddress::Socket(if addr.is_empty() {
            DEFAULT_MYSQL_SOCKET.to_string()
        } else {
            addr.to_string()
        })),
        "" | "tcp" | "tcp4" | "tcp6" => {
            tcp_address(if addr.is_empty() { DEFAULT_MYSQL_TCP_ADDR } else { addr })
        }
        other => Err(DbError::invalid_dsn(
            Dialect::MySql,
            format!("unsupported network '{other}'"),
        )),
    }
}

fn tcp_address(addr: &str) -> DbResult<MySqlAddress> {
    let default_port = Dialect::MySql.default_port().unwrap_or(3306);

    // [v6::addr]:port
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(|| {
            DbError::invalid_dsn(Dialect::MySql, format!("malformed IPv6 address '{addr}'"))
        })?;
        let port = match tail.strip_prefix(':') {
            Some(p) => parse_port(p)?,
            None => default_port,
        };
        return Ok(MySqlAddress::Tcp {
            host: host.to_string(),
            port,
        });
    }

    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => Ok(MySqlAddress::Tcp {
            host: host.to_string(),
            port: parse_port(port)?,
        }),
        _ => Ok(MySqlAddress::Tcp {
            host: addr.to_string(),
            port: default_port,
        }),
    }
}

fn parse_port(port: &str) -> DbResult<u16> {
    port.parse()
        .map_err(|_| DbError::invalid_dsn(Dialect::MySql, format!("invalid port '{port}'")))
}

/// Quote an identifier, quoting each dotted part separately and doubling embedded quotes.
pub fn quote_identifier(name: &str, quote: char) -> String {
    name.split('.')
        .map(|part| quote_name(part, quote))
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a single identifier as-is; dots are part of the name.
pub fn quote_name(name: &str, quote: char) -> String {
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", name.replace(quote, &doubled))
}

/// Render a value as a single-quoted SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// MySQL string literal; backslash is an escape character there by default.
pub fn quote_mysql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}
