//! Fixed-behaviour contents modelled on `/dev/null`, `/dev/zero` and
//! `/dev/urandom`. None of them store anything, so their size is always 0.

use std::io::SeekFrom;

use rand::RngCore;

use super::Content;
use crate::FsError;

/// Always empty. Reads return nothing, writes are accepted and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContent;

impl Content for EmptyContent {
    fn read(&mut self, _count: usize) -> Result<Vec<u8>, FsError> {
        Ok(Vec::new())
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        Ok(data.len())
    }

    fn seek(&mut self, _pos: SeekFrom) -> Result<bool, FsError> {
        Ok(true)
    }

    fn tell(&self) -> u64 {
        0
    }

    fn truncate(&mut self, _size: u64) -> Result<bool, FsError> {
        Ok(true)
    }

    fn is_eof(&self) -> bool {
        true
    }

    fn size(&self) -> u64 {
        0
    }
}

/// Endless stream of NUL bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroContent;

impl Content for ZeroContent {
    fn read(&mut self, count: usize) -> Result<Vec<u8>, FsError> {
        Ok(vec![0; count])
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        Ok(data.len())
    }

    fn seek(&mut self, _pos: SeekFrom) -> Result<bool, FsError> {
        Ok(true)
    }

    fn tell(&self) -> u64 {
        0
    }

    fn truncate(&mut self, _size: u64) -> Result<bool, FsError> {
        Ok(true)
    }

    fn is_eof(&self) -> bool {
        false
    }

    fn size(&self) -> u64 {
        0
    }
}

/// Endless stream of random bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomContent;

impl Content for RandomContent {
    fn read(&mut self, count: usize) -> Result<Vec<u8>, FsError> {
        let mut bytes = vec![0; count];
        rand::thread_rng().fill_bytes(&mut bytes);
        Ok(bytes)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, FsError> {
        Ok(data.len())
    }

    fn seek(&mut self, _pos: SeekFrom) -> Result<bool, FsError> {
        Ok(true)
    }

    fn tell(&self) -> u64 {
        0
    }

    fn truncate(&mut self, _size: u64) -> Result<bool, FsError> {
        Ok(true)
    }

    fn is_eof(&self) -> bool {
        false
    }

    fn size(&self) -> u64 {
        0
    }
}
