use rand::Rng;

pub const CODE_MIN: i32 = 100_000;
pub const CODE_MAX: i32 = 999_999;

/// Draws a 6-digit one-time code, uniform over `[CODE_MIN, CODE_MAX]`.
pub fn generate_code() -> i32 {
    generate_code_with(&mut rand::thread_rng())
}

pub fn generate_code_with<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.gen_range(CODE_MIN..=CODE_MAX)
}

pub fn is_well_formed(code: i32) -> bool {
    (CODE_MIN..=CODE_MAX).contains(&code)
}
