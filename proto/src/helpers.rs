// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Encoding helper for fixed-size byte array fields
pub(crate) mod arr {
    use crate::Error;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < d.len() {
            return Err(Error::InvalidLength);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, Error> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), Error> {
        if buff.len() < N {
            return Err(Error::InvalidLength);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}
