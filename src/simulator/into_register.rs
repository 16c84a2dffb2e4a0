///
/// If a type implements IntoRegister, then we can store its bit representation
/// in a 32-bit register as an i32
///
pub trait IntoRegister {
    fn into(self) -> i32;
}

macro_rules! impl_into_reg {
    ($type:ident) => {
        impl IntoRegister for $type {
            fn into(self) -> i32 {
                self as i32
            }
        }
    };
}

impl_into_reg!(i32);
impl_into_reg!(u32);
impl_into_reg!(u8);

/// Comparisons write 1 or 0
impl IntoRegister for bool {
    fn into(self) -> i32 {
        self as i32
    }
}

/// Reads a register as a signed or unsigned word
pub trait FromRegister {
    fn from(x: i32) -> Self;
}

macro_rules! impl_from_reg {
    ($type:ident) => {
        impl FromRegister for $type {
            fn from(x: i32) -> Self {
                x as $type
            }
        }
    };
}

impl_from_reg!(i32);
impl_from_reg!(u32);
