use crate::domain::account::ACCOUNT_NUMBER_LEN;
use crate::domain::ports::AccountNumberGenerator;
use rand::Rng;

/// Uniformly random 16-digit numbers with a non-zero leading digit.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAccountNumberGenerator;

impl AccountNumberGenerator for RandomAccountNumberGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        let mut number = String::with_capacity(ACCOUNT_NUMBER_LEN);
        number.push(char::from(b'0' + rng.gen_range(1..=9u8)));
        for _ in 1..ACCOUNT_NUMBER_LEN {
            number.push(char::from(b'0' + rng.gen_range(0..=9u8)));
        }
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::is_valid_account_number;

    #[test]
    fn test_generated_numbers_are_well_formed() {
        let generator = RandomAccountNumberGenerator;
        for _ in 0..100 {
            let number = generator.generate();
            assert!(is_valid_account_number(&number), "{number}");
            assert!(!number.starts_with('0'));
        }
    }
}
