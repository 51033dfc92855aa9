use rand::{distributions::Alphanumeric, thread_rng, Rng};

/// Join codes avoid 0, O, 1, and I so they survive being read aloud
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub fn random_string(length: usize) -> String {
    let mut rng = thread_rng();

    std::iter::repeat(())
        .map(|_| rng.sample(Alphanumeric) as char)
        .take(length)
        .collect()
}

pub fn random_code(length: usize) -> String {
    let mut rng = thread_rng();

    (0..length)
        .map(|_| {
            let index = rng.gen_range(0..JOIN_CODE_ALPHABET.len());
            JOIN_CODE_ALPHABET[index] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_use_the_restricted_alphabet() {
        for _ in 0..100 {
            let code = random_code(6);

            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn strings_have_requested_length() {
        assert_eq!(random_string(12).len(), 12);
        assert_eq!(random_string(32).len(), 32);
    }
}
