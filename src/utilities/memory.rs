//! Memory size helpers
#![macro_use]

#[macro_export]
macro_rules! kb {
    ($val:expr) => {
        $val * 1024
    };
}

#[cfg(test)]
mod test {
    #[test]
    fn conversion_macros() {
        assert_eq!(kb!(16), 0x4000);
        assert_eq!(kb!(256), 0x40000);
    }
}
