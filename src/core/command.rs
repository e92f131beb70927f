//! The supported server operations.
//!
//! Each command is a `const` [`Command`]; the table is immutable and is the
//! codec's only source of truth for how an operation is framed.
//!
//! # Example
//!
//! ```
//! use pipedis::command::{self, GET};
//! use pipedis::proto::command::ResponseShape;
//!
//! assert_eq!(GET.response_shape(), ResponseShape::Bulk);
//! assert_eq!(command::lookup("get"), Some(&GET));
//! ```

use crate::proto::command::Command;
use crate::proto::command::RequestShape::*;
use crate::proto::command::ResponseShape::*;

// connection
/// PING
pub const PING: Command = Command::new("PING", NoArg, Status);
/// AUTH password
pub const AUTH: Command = Command::new("AUTH", Key, Status);
/// SELECT db
pub const SELECT: Command = Command::new("SELECT", Key, Status);
/// QUIT; the server closes without replying.
pub const QUIT: Command = Command::new("QUIT", NoArg, Virtual);

// keyspace
/// EXISTS key
pub const EXISTS: Command = Command::new("EXISTS", Key, Boolean);
/// DEL key [key ...]
pub const DEL: Command = Command::new("DEL", MultiKey, Number);
/// TYPE key
pub const TYPE: Command = Command::new("TYPE", Key, String);
/// KEYS pattern; the reply is one space-separated bulk.
pub const KEYS: Command = Command::new("KEYS", Key, Bulk);
/// RANDOMKEY
pub const RANDOMKEY: Command = Command::new("RANDOMKEY", NoArg, String);
/// RENAME key newkey
pub const RENAME: Command = Command::new("RENAME", KeyKey, Status);
/// RENAMENX key newkey
pub const RENAMENX: Command = Command::new("RENAMENX", KeyKey, Boolean);
/// DBSIZE
pub const DBSIZE: Command = Command::new("DBSIZE", NoArg, Number);
/// EXPIRE key seconds
pub const EXPIRE: Command = Command::new("EXPIRE", KeyNum, Boolean);
/// TTL key
pub const TTL: Command = Command::new("TTL", Key, Number);
/// MOVE key db
pub const MOVE: Command = Command::new("MOVE", KeyNum, Boolean);
/// SORT key spec
pub const SORT: Command = Command::new("SORT", KeySpec, MultiBulk);
/// FLUSHDB
pub const FLUSHDB: Command = Command::new("FLUSHDB", NoArg, Status);
/// FLUSHALL
pub const FLUSHALL: Command = Command::new("FLUSHALL", NoArg, Status);

// strings
/// SET key value
pub const SET: Command = Command::new("SET", KeyValue, Status);
/// GET key
pub const GET: Command = Command::new("GET", Key, Bulk);
/// GETSET key value
pub const GETSET: Command = Command::new("GETSET", KeyValue, Bulk);
/// MGET key [key ...]
pub const MGET: Command = Command::new("MGET", MultiKey, MultiBulk);
/// SETNX key value
pub const SETNX: Command = Command::new("SETNX", KeyValue, Boolean);
/// INCR key
pub const INCR: Command = Command::new("INCR", Key, Number);
/// INCRBY key increment
pub const INCRBY: Command = Command::new("INCRBY", KeyNum, Number);
/// DECR key
pub const DECR: Command = Command::new("DECR", Key, Number);
/// DECRBY key decrement
pub const DECRBY: Command = Command::new("DECRBY", KeyNum, Number);

// lists
/// RPUSH key value
pub const RPUSH: Command = Command::new("RPUSH", KeyValue, Status);
/// LPUSH key value
pub const LPUSH: Command = Command::new("LPUSH", KeyValue, Status);
/// LLEN key
pub const LLEN: Command = Command::new("LLEN", Key, Number);
/// LRANGE key start stop
pub const LRANGE: Command = Command::new("LRANGE", KeyNumNum, MultiBulk);
/// LTRIM key start stop
pub const LTRIM: Command = Command::new("LTRIM", KeyNumNum, Status);
/// LINDEX key index
pub const LINDEX: Command = Command::new("LINDEX", KeyNum, Bulk);
/// LSET key index value
pub const LSET: Command = Command::new("LSET", KeyIdxValue, Status);
/// LREM key count value; arguments are given as `[key, value, count]`.
pub const LREM: Command = Command::new("LREM", KeyCntValue, Number);
/// LPOP key
pub const LPOP: Command = Command::new("LPOP", Key, Bulk);
/// RPOP key
pub const RPOP: Command = Command::new("RPOP", Key, Bulk);
/// RPOPLPUSH source destination
pub const RPOPLPUSH: Command = Command::new("RPOPLPUSH", KeyKey, Bulk);

// sets
/// SADD key member
pub const SADD: Command = Command::new("SADD", KeyValue, Boolean);
/// SREM key member
pub const SREM: Command = Command::new("SREM", KeyValue, Boolean);
/// SCARD key
pub const SCARD: Command = Command::new("SCARD", Key, Number);
/// SISMEMBER key member
pub const SISMEMBER: Command = Command::new("SISMEMBER", KeyValue, Boolean);
/// SMEMBERS key
pub const SMEMBERS: Command = Command::new("SMEMBERS", Key, MultiBulk);
/// SMOVE source destination member
pub const SMOVE: Command = Command::new("SMOVE", KeyKeyValue, Boolean);
/// SPOP key
pub const SPOP: Command = Command::new("SPOP", Key, Bulk);
/// SRANDMEMBER key
pub const SRANDMEMBER: Command = Command::new("SRANDMEMBER", Key, Bulk);
/// SINTER key [key ...]
pub const SINTER: Command = Command::new("SINTER", MultiKey, MultiBulk);
/// SINTERSTORE destination key [key ...]
pub const SINTERSTORE: Command = Command::new("SINTERSTORE", MultiKey, Status);
/// SUNION key [key ...]
pub const SUNION: Command = Command::new("SUNION", MultiKey, MultiBulk);
/// SUNIONSTORE destination key [key ...]
pub const SUNIONSTORE: Command = Command::new("SUNIONSTORE", MultiKey, Status);
/// SDIFF key [key ...]
pub const SDIFF: Command = Command::new("SDIFF", MultiKey, MultiBulk);
/// SDIFFSTORE destination key [key ...]
pub const SDIFFSTORE: Command = Command::new("SDIFFSTORE", MultiKey, Status);

// sorted sets
/// ZADD key score member
pub const ZADD: Command = Command::new("ZADD", KeyIdxValue, Boolean);
/// ZREM key member
pub const ZREM: Command = Command::new("ZREM", KeyValue, Boolean);
/// ZCARD key
pub const ZCARD: Command = Command::new("ZCARD", Key, Number);
/// ZSCORE key member; the score comes back as a bulk.
pub const ZSCORE: Command = Command::new("ZSCORE", KeyValue, Bulk);
/// ZINCRBY key increment member
pub const ZINCRBY: Command = Command::new("ZINCRBY", KeyIdxValue, Bulk);
/// ZRANGE key start stop
pub const ZRANGE: Command = Command::new("ZRANGE", KeyNumNum, MultiBulk);
/// ZREVRANGE key start stop
pub const ZREVRANGE: Command = Command::new("ZREVRANGE", KeyNumNum, MultiBulk);
/// ZRANGEBYSCORE key min max
pub const ZRANGEBYSCORE: Command = Command::new("ZRANGEBYSCORE", KeyNumNum, MultiBulk);

// hashes
/// HSET key field value
pub const HSET: Command = Command::new("HSET", KeyKeyValue, Boolean);
/// HGET key field
pub const HGET: Command = Command::new("HGET", KeyKey, Bulk);
/// HDEL key field
pub const HDEL: Command = Command::new("HDEL", KeyKey, Boolean);
/// HEXISTS key field
pub const HEXISTS: Command = Command::new("HEXISTS", KeyKey, Boolean);
/// HLEN key
pub const HLEN: Command = Command::new("HLEN", Key, Number);
/// HKEYS key
pub const HKEYS: Command = Command::new("HKEYS", Key, MultiBulk);
/// HVALS key
pub const HVALS: Command = Command::new("HVALS", Key, MultiBulk);
/// HGETALL key
pub const HGETALL: Command = Command::new("HGETALL", Key, MultiBulk);

// server
/// SAVE
pub const SAVE: Command = Command::new("SAVE", NoArg, Status);
/// BGSAVE
pub const BGSAVE: Command = Command::new("BGSAVE", NoArg, Status);
/// BGREWRITEAOF
pub const BGREWRITEAOF: Command = Command::new("BGREWRITEAOF", NoArg, Status);
/// LASTSAVE
pub const LASTSAVE: Command = Command::new("LASTSAVE", NoArg, Number);
/// INFO; the reply is one bulk of `field:value` lines.
pub const INFO: Command = Command::new("INFO", NoArg, Bulk);

/// Every supported command.
pub static ALL: &[Command] = &[
    PING, AUTH, SELECT, QUIT, EXISTS, DEL, TYPE, KEYS, RANDOMKEY, RENAME, RENAMENX, DBSIZE,
    EXPIRE, TTL, MOVE, SORT, FLUSHDB, FLUSHALL, SET, GET, GETSET, MGET, SETNX, INCR, INCRBY,
    DECR, DECRBY, RPUSH, LPUSH, LLEN, LRANGE, LTRIM, LINDEX, LSET, LREM, LPOP, RPOP, RPOPLPUSH,
    SADD, SREM, SCARD, SISMEMBER, SMEMBERS, SMOVE, SPOP, SRANDMEMBER, SINTER, SINTERSTORE,
    SUNION, SUNIONSTORE, SDIFF, SDIFFSTORE, ZADD, ZREM, ZCARD, ZSCORE, ZINCRBY, ZRANGE,
    ZREVRANGE, ZRANGEBYSCORE, HSET, HGET, HDEL, HEXISTS, HLEN, HKEYS, HVALS, HGETALL, SAVE,
    BGSAVE, BGREWRITEAOF, LASTSAVE, INFO,
];

/// Finds a command by code, ignoring ASCII case.
pub fn lookup(code: &str) -> Option<&'static Command> {
    ALL.iter().find(|cmd| cmd.code().eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::command::{RequestShape, ResponseShape};
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<_> = ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup("SET"), Some(&SET));
        assert_eq!(lookup("zscore"), Some(&ZSCORE));
        assert_eq!(lookup("SUBSCRIBE"), None);
    }

    #[test]
    fn test_shapes() {
        assert_eq!(SET.request_shape(), RequestShape::KeyValue);
        assert_eq!(LREM.request_shape(), RequestShape::KeyCntValue);
        assert_eq!(QUIT.response_shape(), ResponseShape::Virtual);
        assert_eq!(GET.response_shape(), ResponseShape::Bulk);
    }
}
