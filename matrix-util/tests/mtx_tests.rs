use matrix_util::common_io::{create_temp_dir_file, remove_file, write_lines};
use matrix_util::mtx_io::{read_mtx_triplets, write_mtx_triplets};

#[test]
fn mtx_gz_write_and_read() -> anyhow::Result<()> {
    let mtx_file = create_temp_dir_file(".mtx.gz")?;

    let triplets = vec![(0, 0, 3.0_f32), (0, 2, 1.5), (2, 1, 7.0), (3, 2, 1.0)];
    write_mtx_triplets(&triplets, 4, 3, &mtx_file)?;

    let mtx = read_mtx_triplets(&mtx_file)?;
    assert_eq!((mtx.nrows, mtx.ncols), (4, 3));
    assert_eq!(mtx.triplets, triplets);

    remove_file(&mtx_file)?;
    Ok(())
}

#[test]
fn mtx_with_comments_and_integer_field() -> anyhow::Result<()> {
    let mtx_file = create_temp_dir_file(".mtx")?;
    let lines = vec![
        "%%MatrixMarket matrix coordinate integer general",
        "% generated by a counting pipeline",
        "2 2 2",
        "1 2 5",
        "",
        "2 1 4",
    ];
    write_lines(&lines, &mtx_file)?;

    let mtx = read_mtx_triplets(&mtx_file)?;
    assert_eq!(mtx.triplets, vec![(0, 1, 5.0), (1, 0, 4.0)]);
    Ok(())
}

#[test]
fn mtx_with_wrong_nnz_fails() -> anyhow::Result<()> {
    let mtx_file = create_temp_dir_file(".mtx")?;
    let lines = vec![
        "%%MatrixMarket matrix coordinate real general",
        "2 2 3",
        "1 1 1.0",
        "2 2 2.0",
    ];
    write_lines(&lines, &mtx_file)?;

    assert!(read_mtx_triplets(&mtx_file).is_err());
    Ok(())
}

#[test]
fn missing_mtx_fails() {
    assert!(read_mtx_triplets("/nonexistent/path/matrix.mtx.gz").is_err());
}
