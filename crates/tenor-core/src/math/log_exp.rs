//! # Natural Logarithm and Exponential
//!
//! Deterministic `ln` and `exp` on 18-decimal signed values. Both convert to
//! a 2^96 binary basis, reduce the range by powers of two and evaluate a
//! rational approximation, so results are bit-identical on every platform.

use ethnum::{I256, U256};

use crate::constants::{EXP_MAX_INPUT, EXP_MIN_INPUT};
use crate::errors::{CoreResult, TenorError};

/// 5^18, the odd part of 10^18
const FIVE_POW_18: i128 = 3_814_697_265_625;

/// ln(2) in 2^96 basis
const LN_2_X96: i128 = 54_916_777_467_707_473_351_141_471_128;

/// e^x for an 18-decimal signed input
pub fn exp(x: I256) -> CoreResult<I256> {
    if x <= I256::new(EXP_MIN_INPUT) {
        return Ok(I256::ZERO);
    }
    if x >= I256::new(EXP_MAX_INPUT) {
        return Err(TenorError::ExpInputTooLarge);
    }

    // Convert from 1e18 to 2^96 basis: multiply by 2^78 / 5^18
    let mut x = x.wrapping_shl(78) / I256::new(FIVE_POW_18);

    // Factor out powers of two: exp(x) = exp(x') * 2^k with |x'| <= ln(2) / 2
    let k = (x.wrapping_shl(96) / I256::new(LN_2_X96)).wrapping_add(I256::new(1_i128 << 95))
        >> 96_u32;
    x = x.wrapping_sub(k.wrapping_mul(I256::new(LN_2_X96)));

    // (6, 7)-term rational approximation; p is monic
    let mut y = x.wrapping_add(I256::new(1_346_386_616_545_796_478_920_950_773_328));
    y = (y.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(57_155_421_227_552_351_082_224_309_758_442));
    let mut p = y
        .wrapping_add(x)
        .wrapping_sub(I256::new(94_201_549_194_550_492_254_356_042_504_812));
    p = (p.wrapping_mul(y) >> 96_u32)
        .wrapping_add(I256::new(28_719_021_644_029_726_153_956_944_680_412_240));
    p = p
        .wrapping_mul(x)
        .wrapping_add(I256::new(4_385_272_521_454_847_904_659_076_985_693_276).wrapping_shl(96));

    // p stays in 2^192 basis so the division lands in 2^96
    let mut q = x.wrapping_sub(I256::new(2_855_989_394_907_223_263_936_484_059_900));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(50_020_603_652_535_783_019_961_831_881_945));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_sub(I256::new(533_845_033_583_426_703_283_633_433_725_380));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(3_604_857_256_930_695_427_073_651_918_091_429));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_sub(I256::new(14_423_608_567_350_463_180_887_372_962_807_573));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(26_449_188_498_355_588_339_934_803_723_976_023));

    let r = p / q;

    // r is in (0.09, 0.25) * 2^96. Multiply by the scale factor, the 2^k
    // factor and 1e18 / 2^96 in one step with a 2^213 intermediate basis.
    let scale = U256::from_words(
        0x0000_0000_0000_0000_0000_0002_9d9d_c385,
        0x63c3_2e5c_2f6d_c192_ee70_ef65_f997_8af3,
    );
    let shift = (I256::new(195) - k).as_u32();
    let result = r.as_u256().wrapping_mul(scale) >> shift;

    Ok(result.as_i256())
}

/// ln(x) for a strictly positive 18-decimal input
pub fn ln(x: I256) -> CoreResult<I256> {
    if x <= I256::ZERO {
        return Err(TenorError::LnOfNonPositive);
    }

    // ln(x * 2^96 / 1e18) = ln(x) + ln(2^96 / 1e18); the constant is added
    // back at the end, so x is used as-is.
    let msb = 255 - x.leading_zeros();
    let k = I256::new(msb as i128 - 96);

    // Normalize x into [1, 2) * 2^96
    let x = ((x.as_u256().wrapping_shl(255 - msb)) >> 159_u32).as_i256();

    // (8, 8)-term rational approximation; p is monic
    let mut p = x.wrapping_add(I256::new(3_273_285_459_638_523_848_632_254_066_296));
    p = (p.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(24_828_157_081_833_163_892_658_089_445_524));
    p = (p.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(43_456_485_725_739_037_958_740_375_743_393));
    p = (p.wrapping_mul(x) >> 96_u32)
        .wrapping_sub(I256::new(11_111_509_109_440_967_052_023_855_526_967));
    p = (p.wrapping_mul(x) >> 96_u32)
        .wrapping_sub(I256::new(45_023_709_667_254_063_763_336_534_515_857));
    p = (p.wrapping_mul(x) >> 96_u32)
        .wrapping_sub(I256::new(14_706_773_417_378_608_786_704_636_184_526));
    p = p
        .wrapping_mul(x)
        .wrapping_sub(I256::new(795_164_235_651_350_426_258_249_787_498).wrapping_shl(96));

    // p stays in 2^192 basis; q is monic
    let mut q = x.wrapping_add(I256::new(5_573_035_233_440_673_466_300_451_813_936));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(71_694_874_799_317_883_764_090_561_454_958));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(283_447_036_172_924_575_727_196_451_306_956));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(401_686_690_394_027_663_651_624_208_769_553));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(204_048_457_590_392_012_362_485_061_816_622));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(31_853_899_698_501_571_402_653_359_427_138));
    q = (q.wrapping_mul(x) >> 96_u32)
        .wrapping_add(I256::new(909_429_971_244_387_300_277_376_558_375));

    let mut r = p / q;

    // Scale factor s * 5e18 * 2^96; basis becomes 5^18 * 2^192
    let scale = U256::from_words(0x1340, 0xdaa0_d5f7_69db_a191_5cef_59f0_815a_5506).as_i256();
    // ln(2) * 5e18 * 2^192
    let ln_2 = U256::from_words(
        0x0000_0267_a36c_0c95_b397_5ab3_ee5b_203a,
        0x7614_a3f7_5373_f047_d803_ae7b_6687_f2b3,
    )
    .as_i256();
    // ln(2^96 / 1e18) * 5e18 * 2^192
    let ln_basis = U256::from_words(
        0x0000_5711_5e47_018c_7177_eebf_7cd3_70a3,
        0x356a_1b78_6300_8a5a_e802_8c72_b886_4284,
    )
    .as_i256();

    r = r.wrapping_mul(scale);
    r = r.wrapping_add(ln_2.wrapping_mul(k));
    r = r.wrapping_add(ln_basis);

    // Back to 1e18 basis: multiply by 2^18 / 2^192
    Ok(r >> 174_u32)
}
