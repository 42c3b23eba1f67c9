mod phenotype;
