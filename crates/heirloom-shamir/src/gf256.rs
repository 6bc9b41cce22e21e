//! Galois Field GF(256) arithmetic for Shamir's Secret Sharing
//!
//! Uses the AES reduction polynomial x^8 + x^4 + x^3 + x + 1 (0x11B).
//! Multiplication is branch-free and table-free so share values never
//! select memory addresses.

/// Low byte of the reduction polynomial
const REDUCTION: u8 = 0x1B;

/// Add two elements in GF(256) (XOR)
#[inline]
pub fn gf_add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Subtract two elements in GF(256) (same as add in characteristic 2)
#[inline]
pub fn gf_sub(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Multiply two elements in GF(256)
#[inline]
pub fn gf_mul(mut a: u8, mut b: u8) -> u8 {
    let mut product = 0u8;
    for _ in 0..8 {
        // Masks are 0xFF or 0x00
        product ^= a & 0u8.wrapping_sub(b & 1);
        let carry = 0u8.wrapping_sub(a >> 7);
        a = (a << 1) ^ (REDUCTION & carry);
        b >>= 1;
    }
    product
}

/// Multiplicative inverse, computed as a^254. Maps 0 to 0.
pub fn gf_inv(a: u8) -> u8 {
    // a^254 = a^(2+4+8+16+32+64+128)
    let mut result = 1u8;
    let mut square = a;
    for _ in 1..8 {
        square = gf_mul(square, square);
        result = gf_mul(result, square);
    }
    result
}

/// Divide two elements in GF(256)
#[inline]
pub fn gf_div(a: u8, b: u8) -> u8 {
    debug_assert!(b != 0, "Division by zero in GF(256)");
    gf_mul(a, gf_inv(b))
}

/// Evaluate a polynomial at x (coefficients[0] is the constant term)
pub fn poly_eval(coefficients: &[u8], x: u8) -> u8 {
    coefficients
        .iter()
        .rev()
        .fold(0u8, |acc, &coef| gf_add(gf_mul(acc, x), coef))
}

/// Lagrange interpolation at x=0.
///
/// `points` are `(x, y)` pairs with distinct, non-zero `x`.
pub fn lagrange_interpolate(points: &[(u8, u8)]) -> u8 {
    let mut secret = 0u8;

    for (i, &(xi, yi)) in points.iter().enumerate() {
        let mut numerator = 1u8;
        let mut denominator = 1u8;

        for (j, &(xj, _)) in points.iter().enumerate() {
            if i != j {
                // (0 - xj) = xj in characteristic 2
                numerator = gf_mul(numerator, xj);
                denominator = gf_mul(denominator, gf_sub(xi, xj));
            }
        }

        secret = gf_add(secret, gf_mul(yi, gf_div(numerator, denominator)));
    }

    secret
}
