/// Implements `SszSize`, `SszRead`, `SszWrite` and `SszHash` for a container type.
///
/// Fields must be listed in declaration order. Fields named under `skip` are
/// excluded from the encoding and filled in with `Default::default()` when
/// decoding; this is how in-state caches are kept off the wire.
#[macro_export]
macro_rules! impl_ssz_for_container {
    (
        $name:ident {
            $( $field:ident : $ftype:ty ),* $(,)?
        }
        $( skip { $( $skip:ident ),* $(,)? } )?
    ) => {
        impl $crate::SszSize for $name {
            const SIZE: $crate::Size =
                $crate::Size::for_container(&[$( <$ftype as $crate::SszSize>::SIZE ),*]);
        }

        impl<C> $crate::SszRead<C> for $name {
            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn from_ssz_unchecked(
                context: &C,
                bytes: &[u8],
            ) -> Result<Self, $crate::ReadError> {
                $crate::impl_ssz_for_container!(
                    @read [context, bytes] { $($field: $ftype),* } $( skip { $($skip),* } )?
                )
            }
        }

        impl $crate::SszWrite for $name {
            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn write_fixed(&self, bytes: &mut [u8]) {
                $crate::impl_ssz_for_container!(@write_fixed [self, bytes] { $($field: $ftype),* })
            }

            #[allow(unused_assignments, unused_mut)]
            fn write_variable(
                &self,
                bytes: &mut Vec<u8>,
            ) -> Result<(), $crate::WriteError> {
                $crate::impl_ssz_for_container!(
                    @write_variable [self, bytes] { $($field: $ftype),* }
                )
            }
        }

        impl $crate::SszHash for $name {
            type PackingFactor = $crate::U1;

            fn hash_tree_root(&self) -> $crate::H256 {
                $crate::impl_ssz_for_container!(@hash [self] { $($field: $ftype),* })
            }
        }
    };
    (
        <$param:ident: $bound:path> $name:ident {
            $( $field:ident : $ftype:ty ),* $(,)?
        }
        $( skip { $( $skip:ident ),* $(,)? } )?
    ) => {
        impl<$param: $bound> $crate::SszSize for $name<$param> {
            const SIZE: $crate::Size =
                $crate::Size::for_container(&[$( <$ftype as $crate::SszSize>::SIZE ),*]);
        }

        impl<C, $param: $bound> $crate::SszRead<C> for $name<$param> {
            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn from_ssz_unchecked(
                context: &C,
                bytes: &[u8],
            ) -> Result<Self, $crate::ReadError> {
                $crate::impl_ssz_for_container!(
                    @read [context, bytes] { $($field: $ftype),* } $( skip { $($skip),* } )?
                )
            }
        }

        impl<$param: $bound> $crate::SszWrite for $name<$param> {
            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn write_fixed(&self, bytes: &mut [u8]) {
                $crate::impl_ssz_for_container!(@write_fixed [self, bytes] { $($field: $ftype),* })
            }

            #[allow(unused_assignments, unused_mut)]
            fn write_variable(
                &self,
                bytes: &mut Vec<u8>,
            ) -> Result<(), $crate::WriteError> {
                $crate::impl_ssz_for_container!(
                    @write_variable [self, bytes] { $($field: $ftype),* }
                )
            }
        }

        impl<$param: $bound> $crate::SszHash for $name<$param> {
            type PackingFactor = $crate::U1;

            fn hash_tree_root(&self) -> $crate::H256 {
                $crate::impl_ssz_for_container!(@hash [self] { $($field: $ftype),* })
            }
        }
    };
    (
        @read [$context:ident, $bytes:ident]
        { $( $field:ident : $ftype:ty ),* }
        $( skip { $( $skip:ident ),* } )?
    ) => {{
        let mut variable_offsets = Vec::new();
        let mut fixed_offset = 0_usize;

        $(
            match <$ftype as $crate::SszSize>::SIZE {
                $crate::Size::Fixed { size } => fixed_offset += size,
                $crate::Size::Variable { .. } => {
                    let offset_bytes = $crate::subslice(
                        $bytes,
                        fixed_offset..fixed_offset + $crate::BYTES_PER_LENGTH_OFFSET,
                    )?;
                    variable_offsets.push($crate::read_offset(offset_bytes)?);
                    fixed_offset += $crate::BYTES_PER_LENGTH_OFFSET;
                }
            }
        )*

        let mut all_offsets = variable_offsets.clone();
        all_offsets.push($bytes.len());
        $crate::shared::validate_offsets(fixed_offset, &all_offsets, $bytes.len())?;

        let mut variable_index = 0_usize;
        let mut fixed_offset = 0_usize;

        Ok(Self {
            $(
                $field: match <$ftype as $crate::SszSize>::SIZE {
                    $crate::Size::Fixed { size } => {
                        let field_bytes =
                            $crate::subslice($bytes, fixed_offset..fixed_offset + size)?;
                        fixed_offset += size;
                        <$ftype as $crate::SszRead<C>>::from_ssz_unchecked($context, field_bytes)?
                    }
                    $crate::Size::Variable { .. } => {
                        let start = all_offsets[variable_index];
                        let end = all_offsets[variable_index + 1];
                        variable_index += 1;
                        fixed_offset += $crate::BYTES_PER_LENGTH_OFFSET;
                        let field_bytes = $crate::subslice($bytes, start..end)?;
                        <$ftype as $crate::SszRead<C>>::from_ssz($context, field_bytes)?
                    }
                },
            )*
            $( $( $skip: ::core::default::Default::default(), )* )?
        })
    }};
    (@write_fixed [$self:ident, $bytes:ident] { $( $field:ident : $ftype:ty ),* }) => {{
        let mut offset = 0_usize;

        $(
            let size = <$ftype as $crate::SszSize>::SIZE.get();
            <$ftype as $crate::SszWrite>::write_fixed(&$self.$field, &mut $bytes[offset..offset + size]);
            offset += size;
        )*
    }};
    (@write_variable [$self:ident, $bytes:ident] { $( $field:ident : $ftype:ty ),* }) => {{
        let start = $bytes.len();
        let fixed_part = {
            let mut total = 0_usize;
            $( total += <$ftype as $crate::SszSize>::SIZE.fixed_part(); )*
            total
        };

        $bytes.resize(start + fixed_part, 0);

        let mut fixed_offset = 0_usize;

        $(
            match <$ftype as $crate::SszSize>::SIZE {
                $crate::Size::Fixed { size } => {
                    let position = start + fixed_offset;
                    <$ftype as $crate::SszWrite>::write_fixed(
                        &$self.$field,
                        &mut $bytes[position..position + size],
                    );
                    fixed_offset += size;
                }
                $crate::Size::Variable { .. } => {
                    let offset = $bytes.len() - start;
                    let position = start + fixed_offset;
                    $crate::write_offset(&mut $bytes[position..], offset)?;
                    fixed_offset += $crate::BYTES_PER_LENGTH_OFFSET;
                    <$ftype as $crate::SszWrite>::write_variable(&$self.$field, $bytes)?;
                }
            }
        )*

        Ok(())
    }};
    (@hash [$self:ident] { $( $field:ident : $ftype:ty ),* }) => {{
        let chunks = vec![$( $crate::SszHash::hash_tree_root(&$self.$field) ),*];
        let depth = $crate::merkle_tree::depth_for_chunks(chunks.len() as u64);
        $crate::merkle_tree::merkleize_chunks(chunks, depth)
    }};
}

#[cfg(test)]
mod tests {
    use ethereum_types::H256;
    use typenum::U4;

    use crate::{
        contiguous_list::ContiguousList,
        merkle_tree,
        porcelain::{SszHash as _, SszReadDefault as _, SszSize as _, SszWrite as _},
        size::Size,
    };

    #[derive(Clone, PartialEq, Eq, Default, Debug)]
    struct Fixed {
        a: u64,
        b: H256,
    }

    crate::impl_ssz_for_container! {
        Fixed {
            a: u64,
            b: H256,
        }
    }

    #[derive(Clone, PartialEq, Eq, Default, Debug)]
    struct Variable {
        a: u64,
        list: ContiguousList<u64, U4>,
        b: H256,
    }

    crate::impl_ssz_for_container! {
        Variable {
            a: u64,
            list: ContiguousList<u64, U4>,
            b: H256,
        }
    }

    #[test]
    fn fixed_container_layout() {
        assert_eq!(Fixed::SIZE, Size::Fixed { size: 40 });

        let value = Fixed {
            a: 3,
            b: H256::repeat_byte(7),
        };

        let bytes = value.to_ssz().expect("container is serializable");

        assert_eq!(bytes.len(), 40);
        assert_eq!(Fixed::from_ssz_default(bytes).expect("bytes round-trip"), value);
    }

    #[test]
    fn variable_container_round_trip() {
        assert_eq!(Variable::SIZE, Size::Variable { minimum_size: 44 });

        let value = Variable {
            a: 11,
            list: vec![1, 2, 3].try_into().expect("length is valid"),
            b: H256::repeat_byte(9),
        };

        let bytes = value.to_ssz().expect("container is serializable");

        // Fixed part: u64 + offset + hash, then the list contents.
        assert_eq!(bytes.len(), 8 + 4 + 32 + 24);
        assert_eq!(
            Variable::from_ssz_default(bytes).expect("bytes round-trip"),
            value,
        );
    }

    #[test]
    fn container_root_merkleizes_field_roots() {
        let value = Fixed {
            a: 3,
            b: H256::repeat_byte(7),
        };

        let expected = merkle_tree::merkleize_chunks(
            vec![value.a.hash_tree_root(), value.b.hash_tree_root()],
            1,
        );

        assert_eq!(value.hash_tree_root(), expected);
    }
}
